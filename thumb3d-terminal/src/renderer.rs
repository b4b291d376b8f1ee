/// ASCII preview of a finished thumbnail
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use image::RgbaImage;
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Cells whose average coverage is below this stay blank
const MIN_COVERAGE: f32 = 0.25;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: (u8, u8, u8),
}

const BLANK: Cell = Cell {
    character: ' ',
    color: (0, 0, 0),
};

/// Downsamples an RGBA image into a grid of shaded characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BLANK; width * height],
        }
    }

    /// Size a renderer to `columns` wide, keeping the image's aspect ratio
    pub fn fit(image: &RgbaImage, columns: usize) -> Self {
        let columns = columns.max(1);
        let rows = (columns as f32 * image.height() as f32 / image.width().max(1) as f32 / CELL_ASPECT)
            .round()
            .max(1.0) as usize;
        let mut renderer = Self::new(columns, rows);
        renderer.render_image(image);
        renderer
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    pub fn render_image(&mut self, image: &RgbaImage) {
        self.clear();
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }

        for row in 0..self.height {
            let y0 = row * img_h as usize / self.height;
            let y1 = ((row + 1) * img_h as usize / self.height).max(y0 + 1);
            for col in 0..self.width {
                let x0 = col * img_w as usize / self.width;
                let x1 = ((col + 1) * img_w as usize / self.width).max(x0 + 1);
                self.cells[row * self.width + col] = sample_cell(image, x0..x1, y0..y1);
            }
        }
    }

    /// The characters only, one line per row
    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| c.character).collect())
            .collect()
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                let (r, g, b) = cell.color;
                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(cell.character))?;
            }
            writer.queue(ResetColor)?;
            writer.queue(Print('\n'))?;
        }
        writer.flush()
    }
}

fn sample_cell(image: &RgbaImage, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> Cell {
    let mut coverage = 0.0f32;
    let mut rgb = [0.0f32; 3];
    let mut samples = 0.0f32;

    for y in ys {
        for x in xs.clone() {
            let Some(pixel) = image.get_pixel_checked(x as u32, y as u32) else {
                continue;
            };
            let alpha = pixel[3] as f32 / 255.0;
            coverage += alpha;
            for c in 0..3 {
                rgb[c] += pixel[c] as f32 * alpha;
            }
            samples += 1.0;
        }
    }

    if samples == 0.0 || coverage / samples < MIN_COVERAGE {
        return BLANK;
    }

    let [r, g, b] = rgb.map(|c| c / coverage);
    // Rec. 709 luma
    let luma = (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0;
    let index = ((luma * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize).min(LUMINOSITY_RAMP.len() - 1);

    Cell {
        character: LUMINOSITY_RAMP[index],
        color: (r.round() as u8, g.round() as u8, b.round() as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_transparent_image_is_blank() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 0]));
        let mut renderer = AsciiRenderer::new(4, 2);
        renderer.render_image(&image);
        assert!(renderer.lines().iter().all(|line| line == "    "));
    }

    #[test]
    fn test_brightness_maps_to_ramp() {
        let mut image = RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        for y in 0..2 {
            for x in 0..2 {
                image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let mut renderer = AsciiRenderer::new(2, 1);
        renderer.render_image(&image);
        assert_eq!(renderer.lines(), vec![".@".to_string()]);
    }

    #[test]
    fn test_fit_keeps_aspect() {
        let image = RgbaImage::new(400, 400);
        let renderer = AsciiRenderer::fit(&image, 40);
        assert_eq!((renderer.width(), renderer.height()), (40, 20));
    }

    #[test]
    fn test_draw_writes_every_row() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([200, 10, 10, 255]));
        let mut renderer = AsciiRenderer::new(2, 2);
        renderer.render_image(&image);

        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\n').count(), 2);
    }
}

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbaImage;
use thumb3d_core::encode::decode_data_url;
use thumb3d_core::source::ByteProgress;
use thumb3d_core::{CancellationToken, LoadError, Mesh, MemorySource, ModelSource, RenderConfig, RenderEvent, RenderHandle};

/// Small maps and no supersampling keep debug-build tests quick
pub fn fast_config() -> RenderConfig {
    RenderConfig::default()
        .with_supersample(1)
        .with_shadow_map_size(128)
}

pub fn binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(mesh.len() as u32).to_le_bytes());
    for triangle in &mesh.triangles {
        let n = triangle.vertices[0].normal;
        for value in [n.x, n.y, n.z] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            let p = vertex.position;
            for value in [p.x, p.y, p.z] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data.extend_from_slice(&[0, 0]);
    }
    data
}

pub fn cube_stl(size: f32) -> Vec<u8> {
    binary_stl(&Mesh::cube(size))
}

/// Two separate boxes as OBJ objects
pub fn two_box_obj() -> String {
    let mut out = String::new();
    let mut offset = 0;
    for (name, x) in [("left", -2.0f32), ("right", 2.0f32)] {
        out.push_str(&format!("o {name}\n"));
        for corner in 0..8 {
            let dx = if corner & 1 == 0 { -0.5 } else { 0.5 };
            let dy = if corner & 2 == 0 { -0.5 } else { 0.5 };
            let dz = if corner & 4 == 0 { -0.5 } else { 0.5 };
            out.push_str(&format!("v {} {} {}\n", x + dx, dy, dz));
        }
        for face in [[1, 3, 4, 2], [5, 6, 8, 7], [1, 2, 6, 5], [3, 7, 8, 4], [1, 5, 7, 3], [2, 4, 8, 6]] {
            let [a, b, c, d] = face.map(|i| i + offset);
            out.push_str(&format!("f {a} {b} {c} {d}\n"));
        }
        offset += 8;
    }
    out
}

pub fn decode_image(data_url: &str) -> RgbaImage {
    let png = decode_data_url(data_url).expect("data URL");
    image::load_from_memory(&png).expect("PNG").to_rgba8()
}

/// Average color of the opaque pixels
pub fn mean_opaque_color(image: &RgbaImage) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    let mut count = 0.0f32;
    for pixel in image.pixels().filter(|p| p[3] == 255) {
        for c in 0..3 {
            sum[c] += pixel[c] as f32;
        }
        count += 1.0;
    }
    assert!(count > 0.0, "image has no opaque pixels");
    sum.map(|s| s / count)
}

/// Drain a handle until its channel closes
pub fn collect_events(handle: RenderHandle) -> Vec<RenderEvent> {
    let events = handle.events().clone();
    let mut out = Vec::new();
    while let Ok(event) = events.recv_timeout(Duration::from_secs(60)) {
        out.push(event);
    }
    handle.join();
    out
}

/// Terminal events come last, exactly once; progress is monotonic in 0..=100
pub fn assert_well_ordered(events: &[RenderEvent]) {
    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "expected one terminal event in {events:?}");
    assert!(events.last().is_some_and(|e| e.is_terminal()));

    let mut last = 0.0f32;
    for event in events {
        if let RenderEvent::Progress { progress } = event {
            assert!((0.0..=100.0).contains(progress), "progress {progress} out of range");
            assert!(*progress >= last, "progress went backwards");
            last = *progress;
        }
    }
}

/// Memory source whose `gated` URL blocks until the gate is opened
pub struct GatedSource {
    pub inner: MemorySource,
    pub gated: String,
    pub gate: flume::Receiver<()>,
}

impl GatedSource {
    pub fn new(inner: MemorySource, gated: &str) -> (Self, flume::Sender<()>) {
        let (tx, rx) = flume::unbounded();
        (
            Self {
                inner,
                gated: gated.to_string(),
                gate: rx,
            },
            tx,
        )
    }
}

impl ModelSource for GatedSource {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError> {
        if url == self.gated {
            let _ = self.gate.recv_timeout(Duration::from_secs(30));
        }
        self.inner.fetch(url, progress, cancel)
    }
}

/// Serve exactly one HTTP response from a local socket, writing the body
/// in `chunk` sized pieces. Returns the URL to request.
pub fn serve_once(status_line: &'static str, body: Vec<u8>, chunk: usize) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/model", listener.local_addr().expect("addr"));

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let header = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
            body.len()
        );
        if stream.write_all(header.as_bytes()).is_err() {
            return;
        }
        for piece in body.chunks(chunk.max(1)) {
            if stream.write_all(piece).is_err() {
                return;
            }
            let _ = stream.flush();
            thread::sleep(Duration::from_millis(2));
        }
    });

    (url, server)
}

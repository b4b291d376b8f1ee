mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{cube_stl, decode_image, fast_config, mean_opaque_color, GatedSource};
use thumb3d_core::{AdapterState, MemorySource, ThumbnailAdapter};

/// Poll until the adapter leaves the downloading state
fn settle(adapter: &mut ThumbnailAdapter) -> AdapterState {
    let deadline = Instant::now() + Duration::from_secs(60);
    while adapter.is_active() && Instant::now() < deadline {
        adapter.poll_timeout(Duration::from_millis(50));
    }
    adapter.state().clone()
}

#[test]
fn completes_and_exposes_the_data_url() {
    let source = Arc::new(MemorySource::new().with("cube.stl", cube_stl(3.0)));
    let mut adapter = ThumbnailAdapter::with_source(fast_config(), source).with_size(40, 40);

    adapter.set_params(Some("cube.stl"), Some("stl"), None);
    assert!(adapter.view().loading);

    let AdapterState::Complete { data } = settle(&mut adapter) else {
        panic!("expected completion, got {:?}", adapter.state());
    };
    let view = adapter.view();
    assert_eq!(view.data.as_deref(), Some(data.as_str()));
    assert_eq!(view.progress, Some(100.0));
    assert!(!view.loading);
    assert_eq!(view.error, None);

    // Same parameters again do not restart anything
    adapter.set_params(Some("cube.stl"), Some("stl"), Some("#808080"));
    assert!(!adapter.is_active());
    assert!(matches!(adapter.state(), AdapterState::Complete { .. }));
}

#[test]
fn superseded_render_is_discarded() {
    let memory = MemorySource::new()
        .with("slow.stl", cube_stl(1.0))
        .with("fast.stl", cube_stl(1.0));
    let (source, gate) = GatedSource::new(memory, "slow.stl");
    let mut adapter = ThumbnailAdapter::with_source(fast_config(), Arc::new(source)).with_size(48, 48);

    adapter.set_params(Some("slow.stl"), Some("stl"), Some("#ff0000"));
    adapter.set_params(Some("fast.stl"), Some("stl"), Some("#0000ff"));

    let state = settle(&mut adapter);
    // Let the slow render run to the end after its replacement finished
    gate.send(()).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    assert!(!adapter.poll());

    let AdapterState::Complete { data } = state else {
        panic!("expected completion, got {state:?}");
    };
    assert_eq!(adapter.state(), &AdapterState::Complete { data: data.clone() });
    let [r, _, b] = mean_opaque_color(&decode_image(&data));
    assert!(b > r, "latest request was blue");
}

#[test]
fn load_failure_sets_error_state() {
    let mut adapter = ThumbnailAdapter::with_source(fast_config(), Arc::new(MemorySource::new()));
    adapter.set_params(Some("missing.obj"), Some("obj"), Some("#808080"));

    let AdapterState::Error { message } = settle(&mut adapter) else {
        panic!("expected an error, got {:?}", adapter.state());
    };
    assert!(message.contains("missing.obj"));
    assert_eq!(adapter.view().error, Some(message));
    assert_eq!(adapter.view().data, None);
}

#[test]
fn clearing_the_url_returns_to_idle() {
    let source = Arc::new(MemorySource::new().with("cube.stl", cube_stl(1.0)));
    let mut adapter = ThumbnailAdapter::with_source(fast_config(), source).with_size(32, 32);

    adapter.set_params(Some("cube.stl"), Some("stl"), None);
    adapter.set_params(None, Some("stl"), None);
    assert_eq!(adapter.state(), &AdapterState::Idle);
    assert!(!adapter.is_active());

    adapter.set_params(Some("cube.stl"), Some("ply"), None);
    assert_eq!(adapter.state(), &AdapterState::Idle);
}

#[test]
fn teardown_cancels_the_active_render() {
    let (source, gate) = GatedSource::new(MemorySource::new().with("slow.stl", cube_stl(1.0)), "slow.stl");
    let mut adapter = ThumbnailAdapter::with_source(fast_config(), Arc::new(source));

    adapter.set_params(Some("slow.stl"), Some("stl"), None);
    assert!(adapter.is_active());
    adapter.teardown();
    gate.send(()).unwrap();

    assert!(!adapter.is_active());
    assert_eq!(adapter.state(), &AdapterState::Idle);
    assert!(!adapter.poll_timeout(Duration::from_millis(100)));
}

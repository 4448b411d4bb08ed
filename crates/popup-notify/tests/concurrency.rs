mod support;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use popup_notify::{PopupConfig, ThreadDispatcher, UiDispatcher};

use support::{Harness, default_geometry};

fn threaded_harness() -> (Harness, Arc<ThreadDispatcher>) {
    let ui = Arc::new(ThreadDispatcher::spawn("popup-ui-test").expect("spawn UI thread"));
    let h = Harness::with(PopupConfig::default(), default_geometry(), ui.clone());
    (h, ui)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simultaneous_first_messages_create_one_popup() {
    let (h, _ui) = threaded_harness();
    let producers = 8;
    let barrier = Arc::new(Barrier::new(producers));

    let handles: Vec<_> = (0..producers)
        .map(|i| {
            let controller = h.controller.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                controller.add_message(format!("producer {i}"));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(h.factory.created(), 1);
    assert!(h.controller.is_active());
    assert_eq!(h.controller.message_count(), producers);
    assert_eq!(h.controller.backlog_len(), 0);

    h.controller.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_producer_order_is_kept_across_threads() {
    let (h, _ui) = threaded_harness();

    let controller = h.controller.clone();
    thread::spawn(move || {
        for i in 0..50 {
            controller.add_message(format!("{i}"));
        }
    })
    .join()
    .unwrap();

    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(h.texts(), expected);

    h.controller.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_message_from_ui_thread_does_not_deadlock() {
    let (h, ui) = threaded_harness();

    let controller = h.controller.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    ui.post(Box::new(move || {
        controller.add_message("from the UI thread");
        let _ = tx.send(());
    }))
    .unwrap();

    rx.recv_timeout(Duration::from_secs(5))
        .expect("UI-thread producer finished");
    assert_eq!(h.texts(), vec!["from the UI thread"]);

    h.controller.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_click_on_threaded_surface_closes_popup() {
    let (h, _ui) = threaded_harness();
    h.controller.add_message("click me");

    h.factory.last().click();

    let mut closed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if !h.controller.is_active() {
            closed = true;
            break;
        }
    }
    assert!(closed, "popup did not close after click");
    assert_eq!(h.factory.last().closed(), 1);
}

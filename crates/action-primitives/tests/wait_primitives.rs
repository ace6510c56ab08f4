use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    wait_for_any_element, wait_for_element, wait_for_element_removed, ElementQuery,
};
use dom_memory::{ElementSpec, MemoryDocument};
use domflow_core_types::Document;
use tokio::time::{sleep, Instant};

fn setup() -> (MemoryDocument, Arc<dyn Document>) {
    let memory = MemoryDocument::new();
    let port: Arc<dyn Document> = Arc::new(memory.clone());
    (memory, port)
}

#[tokio::test(start_paused = true)]
async fn present_element_resolves_without_observer() {
    let (memory, port) = setup();
    let button = memory.append_to_body(ElementSpec::new("button").test_id("go"));

    let found = wait_for_element(&port, "[data-testid=go]", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(found, Some(button));
    assert_eq!(memory.observers_created(), 0);
}

#[tokio::test(start_paused = true)]
async fn absent_element_times_out_with_none() {
    let (memory, port) = setup();
    let started = Instant::now();

    let found = wait_for_element(&port, ".never", Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(found, None);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(memory.observers_created(), 1);
    assert_eq!(memory.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn element_added_later_is_found() {
    let (memory, port) = setup();
    let adder = memory.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(300)).await;
        adder.append_to_body(ElementSpec::new("div").class("noise"));
        sleep(Duration::from_millis(300)).await;
        adder.append_to_body(ElementSpec::new("div").class("modal"));
    });

    let started = Instant::now();
    let found = wait_for_element(&port, ".modal", Duration::from_secs(5))
        .await
        .unwrap();
    assert!(found.is_some());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600) && elapsed < Duration::from_secs(5));
    assert_eq!(memory.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn any_element_prefers_list_order() {
    let (memory, port) = setup();
    let adder = memory.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let body = adder.body();
        adder
            .append(
                &body,
                ElementSpec::new("section")
                    .child(ElementSpec::new("p").class("second"))
                    .child(ElementSpec::new("p").class("first")),
            )
            .unwrap();
    });

    let (index, element) =
        wait_for_any_element(&port, &[".first", ".second"], Duration::from_secs(1))
            .await
            .unwrap()
            .expect("one of the selectors matches");
    assert_eq!(index, 0);
    assert!(memory.has_class(&element, "first").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn any_element_times_out() {
    let (_memory, port) = setup();
    let found = wait_for_any_element(&port, &["a", "b"], Duration::from_millis(200))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test(start_paused = true)]
async fn removal_of_absent_element_is_immediate() {
    let (memory, port) = setup();
    assert!(wait_for_element_removed(&port, ".spinner", Duration::from_secs(1))
        .await
        .unwrap());
    assert_eq!(memory.observers_created(), 0);
}

#[tokio::test(start_paused = true)]
async fn removal_settles_once_for_two_satisfying_mutations() {
    let (memory, port) = setup();
    let first = memory.append_to_body(ElementSpec::new("div").class("spinner"));
    let second = memory.append_to_body(ElementSpec::new("div").class("other"));

    let remover = memory.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        remover.remove(&first).unwrap();
        remover.remove(&second).unwrap();
    });

    assert!(wait_for_element_removed(&port, ".spinner", Duration::from_secs(1))
        .await
        .unwrap());
    assert_eq!(memory.observers_created(), 1);
    assert_eq!(memory.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn removal_times_out_with_false() {
    let (memory, port) = setup();
    memory.append_to_body(ElementSpec::new("div").class("spinner"));
    assert!(!wait_for_element_removed(&port, ".spinner", Duration::from_millis(250))
        .await
        .unwrap());
    assert_eq!(memory.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_selectors_surface_as_errors() {
    let (_memory, port) = setup();
    assert!(wait_for_element(&port, "button:hover", Duration::from_secs(1))
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn element_query_uses_alternatives() {
    let (memory, port) = setup();
    let link = memory.append_to_body(ElementSpec::new("a").attr("href", "https://x"));
    let query =
        ElementQuery::any(["button.primary", "a[href]"]).with_timeout(Duration::from_millis(10));
    assert_eq!(query.wait(&port).await.unwrap(), Some(link));
}

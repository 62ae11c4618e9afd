use crate::action::{settled, ActionError, ActionSlot, ActionState};
use device_kit::{ActionEvent, ActionStream};
use futures::StreamExt;
use shared::{
    domain::{ActionProgress, UserInteraction},
    error::{DeviceError, DeviceErrorCode},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

fn scripted(events: Vec<ActionEvent<String>>) -> ActionStream<String> {
    futures::stream::iter(events).boxed()
}

fn channel_stream() -> (mpsc::Sender<ActionEvent<String>>, ActionStream<String>) {
    let (tx, rx) = mpsc::channel(8);
    (tx, ReceiverStream::new(rx).boxed())
}

#[tokio::test]
async fn run_clears_the_slot_before_any_new_value() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    slot.fail(ActionError::InvalidRequest("stale".into()));
    assert!(slot.state().error().is_some());

    let (tx, stream) = channel_stream();
    slot.run(stream);
    // Reset is synchronous; nothing has been emitted yet.
    assert_eq!(slot.state(), ActionState::Idle);
    assert!(!slot.is_busy());

    tx.send(ActionEvent::Completed("done".to_string()))
        .await
        .expect("driver alive");
    let mut rx = slot.subscribe();
    assert_eq!(
        settled(&mut rx).await,
        ActionState::Completed("done".to_string())
    );
}

#[tokio::test]
async fn completed_terminal_settles_with_output_only() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    slot.run(scripted(vec![
        ActionEvent::Pending(ActionProgress::none()),
        ActionEvent::Completed("0xABCD".to_string()),
    ]));

    let mut rx = slot.subscribe();
    let state = settled(&mut rx).await;
    assert_eq!(state.output(), Some(&"0xABCD".to_string()));
    assert_eq!(state.error(), None);
    assert!(!state.is_busy());
}

#[tokio::test]
async fn pending_sequence_is_observable_in_order_then_failure_wins() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    let (tx, stream) = channel_stream();
    slot.run(stream);
    let mut rx = slot.subscribe();

    let steps = [
        UserInteraction::ConfirmOpenApp,
        UserInteraction::SignTransaction,
    ];
    for step in steps {
        tx.send(ActionEvent::Pending(ActionProgress::awaiting(step)))
            .await
            .expect("driver alive");
        rx.changed().await.expect("pending update");
        assert_eq!(
            *rx.borrow_and_update(),
            ActionState::Pending(ActionProgress::awaiting(step))
        );
        assert!(slot.is_busy());
    }

    let denial = DeviceError::refused("denied by user");
    tx.send(ActionEvent::Failed(denial.clone()))
        .await
        .expect("driver alive");
    rx.changed().await.expect("terminal update");
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.error(), Some(&ActionError::Device(denial)));
    assert_eq!(state.output(), None);
    assert!(!state.is_busy());
}

#[tokio::test]
async fn stream_ending_without_terminal_counts_as_failure() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    slot.run(scripted(vec![ActionEvent::Pending(ActionProgress::none())]));

    let mut rx = slot.subscribe();
    assert_eq!(
        settled(&mut rx).await,
        ActionState::Failed(ActionError::StreamClosed)
    );
}

#[tokio::test]
async fn superseding_run_aborts_the_previous_driver() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    let (first_tx, first_stream) = channel_stream();
    slot.run(first_stream);
    first_tx
        .send(ActionEvent::Pending(ActionProgress::none()))
        .await
        .expect("first driver alive");

    slot.run(scripted(vec![ActionEvent::Completed("second".to_string())]));
    let mut rx = slot.subscribe();
    assert_eq!(
        settled(&mut rx).await,
        ActionState::Completed("second".to_string())
    );

    // The first driver is aborted; its terminal can no longer land.
    let _ = first_tx.send(ActionEvent::Completed("first".to_string())).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(slot.state(), ActionState::Completed("second".to_string()));
}

#[tokio::test]
async fn fail_is_synchronous_and_supersedes() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    let (_tx, stream) = channel_stream();
    slot.run(stream);

    slot.fail(ActionError::InvalidRequest("bad payload".into()));
    assert_eq!(
        slot.state(),
        ActionState::Failed(ActionError::InvalidRequest("bad payload".into()))
    );
}

#[tokio::test]
async fn run_future_settles_both_ways() {
    let slot: ActionSlot<String> = ActionSlot::new("test");
    slot.run_future(async { Ok("ready".to_string()) });
    let mut rx = slot.subscribe();
    assert_eq!(
        settled(&mut rx).await,
        ActionState::Completed("ready".to_string())
    );

    slot.run_future(async {
        Err(ActionError::Device(DeviceError::new(
            DeviceErrorCode::Io,
            "usb gone",
        )))
    });
    let mut rx = slot.subscribe();
    let state = settled(&mut rx).await;
    assert!(matches!(
        state,
        ActionState::Failed(ActionError::Device(ref err)) if err.code == DeviceErrorCode::Io
    ));
}

//! Property-based tests for the stream stack's closing policy

use super::*;
use crate::conversation::testing::RecordingDispatcher;
use crate::protocol::PayloadType;
use proptest::prelude::*;

fn arb_payload_type() -> impl Strategy<Value = PayloadType> {
    prop_oneof![
        3 => Just(PayloadType::Voice),
        1 => Just(PayloadType::Response),
        1 => Just(PayloadType::Search),
        1 => Just(PayloadType::Browse),
        1 => Just(PayloadType::Python),
        1 => Just(PayloadType::Reminders),
        1 => Just(PayloadType::Play),
        1 => Just(PayloadType::Pop),
        1 => Just(PayloadType::Unknown('?')),
        1 => Just(PayloadType::FollowUp),
        1 => Just(PayloadType::End),
    ]
}

fn arb_command_type() -> impl Strategy<Value = PayloadType> {
    prop_oneof![
        Just(PayloadType::Search),
        Just(PayloadType::Browse),
        Just(PayloadType::Open),
        Just(PayloadType::Pip),
        Just(PayloadType::Reminders),
    ]
}

/// Reference model: pop one unless voice, push if the tag opens a channel
fn model_step(model: &mut Vec<PayloadType>, tag: PayloadType) {
    if !tag.is_aside() && model.len() > 1 {
        model.pop();
    }
    if tag.command().is_some() {
        model.push(tag);
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_stack_matches_model(tags in prop::collection::vec(arb_payload_type(), 0..24)) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let dispatcher = RecordingDispatcher::new();
            let (base, reader) = channel(PayloadType::Response, 1);
            tokio::spawn(reader.read_to_end());
            let mut stack = StreamStack::new(base, &dispatcher, 1);
            let mut model = vec![PayloadType::Response];

            for tag in tags {
                stack.transition(tag, "data").await;
                model_step(&mut model, tag);
                prop_assert_eq!(stack.open_payloads(), model.clone());
            }

            let outcome = stack.finish().await;
            dispatcher.settle().await;
            prop_assert_eq!(outcome.pending.len(), dispatcher.started().len());
            prop_assert_eq!(dispatcher.aborted(), 0);
            Ok(())
        });
        result?;
    }

    #[test]
    fn prop_without_voice_one_channel_at_a_time(
        tags in prop::collection::vec(arb_command_type(), 1..16)
    ) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let dispatcher = RecordingDispatcher::new();
            let (base, reader) = channel(PayloadType::Response, 1);
            tokio::spawn(reader.read_to_end());
            let mut stack = StreamStack::new(base, &dispatcher, 1);

            for (i, tag) in tags.iter().enumerate() {
                stack.transition(*tag, &i.to_string()).await;
                prop_assert_eq!(stack.depth(), 2);
                // Every earlier channel has been closed and read in full
                dispatcher.wait_closed(i).await;
                prop_assert_eq!(dispatcher.closed().len(), i);
            }
            Ok(())
        });
        result?;
    }

    #[test]
    fn prop_voice_run_closes_one_per_transition(n in 1usize..8, next in arb_command_type()) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let dispatcher = RecordingDispatcher::new();
            let (base, reader) = channel(PayloadType::Response, 1);
            tokio::spawn(reader.read_to_end());
            let mut stack = StreamStack::new(base, &dispatcher, 1);

            for _ in 0..n {
                stack.transition(PayloadType::Voice, "QUJD").await;
            }
            stack.transition(next, "payload").await;
            dispatcher.wait_closed(1).await;
            prop_assert_eq!(dispatcher.closed().len(), 1);
            prop_assert_eq!(stack.depth(), 1 + (n - 1) + 1);

            stack.drain().await;
            dispatcher.wait_closed(n + 1).await;
            prop_assert_eq!(dispatcher.closed().len(), n + 1);
            prop_assert_eq!(stack.depth(), 1);
            Ok(())
        });
        result?;
    }
}

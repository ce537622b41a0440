//! Property tests for the confirmation gate

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use common::{CountingRefresher, RecordingNotifier, ScriptedTransport};
use taskchat::api::AssistReply;
use taskchat::conversation::{Conversation, Phase, SendOutcome};
use taskchat::effects::EffectPropagator;

const KINDS: [&str; 6] = [
    "categories",
    "tasks",
    "update_categories",
    "update_tasks",
    "delete_categories",
    "delete_tasks",
];

fn conversation() -> Conversation {
    let effects = EffectPropagator::new(
        Arc::new(CountingRefresher::default()),
        Arc::new(RecordingNotifier::default()),
    );
    let mut conversation = Conversation::new(Arc::new(ScriptedTransport::default()), effects);
    conversation.open();
    conversation
}

/// Reply the conversation would get for `plan`, run through one send
fn deliver(plan: Value, reply: Option<String>) -> (Conversation, SendOutcome) {
    let mut conversation = conversation();
    let ticket = conversation.begin_send("сделай что-нибудь").unwrap();
    let outcome = conversation.finish_send(
        ticket,
        Ok(AssistReply {
            reply,
            plan: Some(plan),
            requires_confirmation: true,
            ..Default::default()
        }),
    );
    (conversation, outcome)
}

/// Plans whose sequences are all empty, null or missing
fn empty_plan_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(
        prop_oneof![Just(None), Just(Some(Value::Null)), Just(Some(json!([])))],
        KINDS.len(),
    )
    .prop_map(|slots| {
        let mut map = Map::new();
        for (kind, slot) in KINDS.iter().zip(slots) {
            if let Some(value) = slot {
                map.insert(kind.to_string(), value);
            }
        }
        Value::Object(map)
    })
}

/// Values that are not a plan at all
fn non_plan_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
        Just(json!([{ "title": "A" }])),
    ]
}

/// A plan with at least one deletion by title
fn delete_plan_strategy() -> impl Strategy<Value = (Value, usize)> {
    prop::collection::vec("[A-Za-zА-я]{1,10}", 1..12).prop_map(|titles| {
        let count = titles.len();
        let items: Vec<Value> = titles.into_iter().map(|t| json!({ "title": t })).collect();
        (json!({ "delete_tasks": items }), count)
    })
}

/// Any JSON scalar, for fields the model may fill with the wrong type
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(|f| json!(f)),
        "[A-Za-zА-я0-9 -]{0,12}".prop_map(Value::String),
    ]
}

/// Task creations whose fields carry arbitrary scalars
fn mistyped_task_plan_strategy() -> impl Strategy<Value = (Value, usize)> {
    let item = (scalar_strategy(), scalar_strategy(), scalar_strategy(), scalar_strategy()).prop_map(
        |(title, priority, deadline, category)| {
            json!({ "title": title, "priority": priority, "deadline": deadline, "category": category })
        },
    );
    prop::collection::vec(item, 1..8).prop_map(|items| {
        let count = items.len();
        (json!({ "tasks": items }), count)
    })
}

proptest! {
    #[test]
    fn empty_plans_never_await_confirmation(
        plan in empty_plan_strategy(),
        reply in prop::option::of("[a-z ]{0,16}"),
    ) {
        let (conversation, outcome) = deliver(plan, reply);
        prop_assert_eq!(outcome, SendOutcome::Replied);
        prop_assert_eq!(conversation.phase(), Phase::AwaitingInput);
        prop_assert!(conversation.pending_plan().is_none());
        prop_assert!(!conversation.is_loading());
    }

    #[test]
    fn non_object_plans_never_await_confirmation(plan in non_plan_strategy()) {
        let (conversation, outcome) = deliver(plan, None);
        prop_assert_eq!(outcome, SendOutcome::Replied);
        prop_assert_eq!(conversation.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn pending_plan_keeps_the_received_json((plan, count) in delete_plan_strategy()) {
        let (mut conversation, outcome) = deliver(plan.clone(), Some("план".to_string()));
        prop_assert_eq!(outcome, SendOutcome::PlanProposed { items: count });
        prop_assert_eq!(conversation.phase(), Phase::AwaitingConfirmation);

        let ticket = conversation.begin_confirm().unwrap();
        prop_assert_eq!(ticket.plan().raw(), &plan);
    }

    #[test]
    fn mistyped_item_fields_still_await_confirmation((plan, count) in mistyped_task_plan_strategy()) {
        let (mut conversation, outcome) = deliver(plan.clone(), Some("план".to_string()));
        prop_assert_eq!(outcome, SendOutcome::PlanProposed { items: count });
        prop_assert_eq!(conversation.phase(), Phase::AwaitingConfirmation);
        // greeting + user message, reply text suppressed
        prop_assert_eq!(conversation.messages().len(), 2);

        let ticket = conversation.begin_confirm().unwrap();
        prop_assert_eq!(ticket.plan().raw(), &plan);
    }
}

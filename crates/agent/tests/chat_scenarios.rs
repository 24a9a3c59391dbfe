use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use printdesk_agent::{ChatReply, ChatRuntime};
use printdesk_core::flows::{labels, FlowServices, FlowSettings, Locus, NegotiationStage, Phase};
use printdesk_core::{
    CategoryNode, CategoryRoot, InMemoryAuditSink, InMemoryDataStore, OrderStatus, Quote, QuoteId,
};

const CUSTOMER: &str = "6f1c2b0e-4f7a-4a59-9a51-0d7f2c3b9e11";
const OTHER_CUSTOMER: &str = "0b7d8c8e-2f3a-4c55-8f6e-6a1f0f0d2c44";
const SCENARIO_A: [&str; 7] =
    ["Place Order", "Printing", "Business Cards", "Matte", "A4", "100 pcs", "Confirm Order"];

async fn fixture() -> (Arc<InMemoryDataStore>, ChatRuntime) {
    let store = Arc::new(
        InMemoryDataStore::new()
            .with_categories(vec![
                CategoryNode::new("printing", None, CategoryRoot::Products, "Printing"),
                CategoryNode::new("cards", Some("printing"), CategoryRoot::Products, "Business Cards"),
                CategoryNode::new("posters", Some("printing"), CategoryRoot::Products, "Posters"),
                CategoryNode::new("large", None, CategoryRoot::Products, "Large Format"),
                CategoryNode::new("tarp", Some("large"), CategoryRoot::Products, "Tarpaulin"),
                CategoryNode::new("matte", None, CategoryRoot::Specifications, "Matte"),
                CategoryNode::new("glossy", None, CategoryRoot::Specifications, "Glossy"),
                CategoryNode::new("a4", None, CategoryRoot::Sizes, "A4"),
                CategoryNode::new("a3", None, CategoryRoot::Sizes, "A3"),
                CategoryNode::new("q100", None, CategoryRoot::Quantities, "100 pcs"),
                CategoryNode::new("q500", None, CategoryRoot::Quantities, "500 pcs"),
            ])
            .await,
    );
    let services = FlowServices::new(
        Arc::clone(&store),
        FlowSettings::default(),
        Arc::new(InMemoryAuditSink::default()),
    );
    let runtime = ChatRuntime::standard(services).expect("standard flows");
    (store, runtime)
}

async fn play(runtime: &ChatRuntime, start: &ChatReply, inputs: &[&str]) -> ChatReply {
    let mut reply = start.clone();
    for input in inputs {
        reply = runtime.handle_input(&start.session_id, input).await.expect("turn");
    }
    reply
}

async fn issue_quote(store: &InMemoryDataStore, price: i64) {
    let order = store.orders().await.remove(0);
    store
        .issue_quote(Quote {
            id: QuoteId(format!("quote-{price}")),
            order_id: order.id,
            initial_price: Decimal::new(price, 0),
            negotiated_price: None,
            issued_at: Utc::now() - Duration::seconds(1),
            due_at: Utc::now() + Duration::days(7),
        })
        .await;
}

fn text(reply: &ChatReply) -> String {
    reply.messages.iter().map(|message| message.text.as_str()).collect::<Vec<_>>().join("\n")
}

#[tokio::test]
async fn scenario_a_signed_in_order_is_placed_once() {
    let (store, runtime) = fixture().await;
    let start = runtime.start_session(Some(CUSTOMER.to_owned())).await;

    let reply = play(&runtime, &start, &SCENARIO_A).await;

    assert_eq!(reply.quick_replies, vec![labels::CHECK_QUOTE.to_owned()]);
    let orders = store.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].service_name, "Business Cards");
    assert_eq!(orders[0].quantity, 100);
}

#[tokio::test]
async fn scenario_b_quote_still_pending() {
    let (_store, runtime) = fixture().await;
    let start = runtime.start_session(Some(CUSTOMER.to_owned())).await;
    play(&runtime, &start, &SCENARIO_A).await;

    let reply = runtime.handle_input(&start.session_id, labels::CHECK_QUOTE).await.expect("turn");

    assert!(text(&reply).to_lowercase().contains("still pending"));
    assert_eq!(reply.quick_replies, vec![labels::CHECK_QUOTE.to_owned()]);
}

#[tokio::test]
async fn scenario_c_counter_offer_switches_primary_action() {
    let (store, runtime) = fixture().await;
    let start = runtime.start_session(Some(CUSTOMER.to_owned())).await;
    play(&runtime, &start, &SCENARIO_A).await;
    issue_quote(&store, 1_200).await;

    let reply =
        play(&runtime, &start, &[labels::CHECK_QUOTE, labels::NEGOTIATE_PRICING, "150"]).await;

    assert!(reply.quick_replies.contains(&labels::SUBMIT_MODIFIED.to_owned()));
    assert!(!reply.quick_replies.contains(&labels::ACCEPT_QUOTE.to_owned()));
    let context = runtime.context(&start.session_id).await.expect("context");
    match context.locus {
        Locus::Negotiating(state) => {
            assert_eq!(state.stage, NegotiationStage::Reviewing);
            assert!(state.modified());
            assert_eq!(state.proposed_price, Some(Decimal::new(150, 0)));
        }
        other => panic!("expected negotiation, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_d_accept_with_unsaved_changes_is_refused() {
    let (store, runtime) = fixture().await;
    let start = runtime.start_session(Some(CUSTOMER.to_owned())).await;
    play(&runtime, &start, &SCENARIO_A).await;
    issue_quote(&store, 1_200).await;
    play(&runtime, &start, &[labels::CHECK_QUOTE, labels::NEGOTIATE_PRICING, "150"]).await;
    let before = runtime.context(&start.session_id).await.expect("context");

    let reply = runtime.handle_input(&start.session_id, labels::ACCEPT_QUOTE).await.expect("turn");

    assert!(text(&reply).contains("unsaved changes"));
    let after = runtime.context(&start.session_id).await.expect("context");
    assert_eq!(after.locus, before.locus);
    assert_eq!(store.orders().await[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn resubmitted_counter_offer_waits_for_a_new_quote() {
    let (store, runtime) = fixture().await;
    let start = runtime.start_session(Some(CUSTOMER.to_owned())).await;
    play(&runtime, &start, &SCENARIO_A).await;
    issue_quote(&store, 1_200).await;

    let reply = play(
        &runtime,
        &start,
        &[labels::CHECK_QUOTE, labels::NEGOTIATE_PRICING, "950", labels::SUBMIT_MODIFIED],
    )
    .await;

    assert_eq!(reply.quick_replies, vec![labels::CHECK_QUOTE.to_owned()]);
    let order = store.orders().await.remove(0);
    assert_eq!(order.status, OrderStatus::NeedsQuote);
    assert_eq!(order.proposed_price, Some(Decimal::new(950, 0)));

    let stale = runtime.handle_input(&start.session_id, labels::CHECK_QUOTE).await.expect("turn");
    assert_eq!(stale.quick_replies, vec![labels::CHECK_QUOTE.to_owned()]);
}

#[tokio::test]
async fn sessions_do_not_share_navigation_state() {
    let (store, runtime) = fixture().await;
    let first = runtime.start_session(Some(CUSTOMER.to_owned())).await;
    let second = runtime.start_session(Some(OTHER_CUSTOMER.to_owned())).await;

    runtime.handle_input(&first.session_id, labels::PLACE_ORDER).await.expect("turn");
    runtime.handle_input(&second.session_id, labels::PLACE_ORDER).await.expect("turn");
    runtime.handle_input(&first.session_id, "Printing").await.expect("turn");
    runtime.handle_input(&second.session_id, "Large Format").await.expect("turn");
    runtime.handle_input(&first.session_id, "Business Cards").await.expect("turn");

    let first_context = runtime.context(&first.session_id).await.expect("context");
    let second_context = runtime.context(&second.session_id).await.expect("context");
    match (&first_context.locus, &second_context.locus) {
        (Locus::Ordering(first), Locus::Ordering(second)) => {
            assert_eq!(first.phase, Phase::Specifications);
            assert_eq!(first.draft.product_name.as_deref(), Some("Business Cards"));
            assert_eq!(second.phase, Phase::Products);
            assert_eq!(second.draft.product_name, None);
        }
        other => panic!("expected two ordering sessions, got {other:?}"),
    }

    play(&runtime, &first, &["Matte", "A4", "100 pcs", labels::CONFIRM_ORDER]).await;
    play(&runtime, &second, &["Tarpaulin", "Glossy", "A3", "500 pcs", labels::CONFIRM_ORDER]).await;

    let orders = store.orders().await;
    assert_eq!(orders.len(), 2);
    let mut owners: Vec<String> = orders.iter().map(|order| order.customer_id.to_string()).collect();
    owners.sort();
    let mut expected = vec![CUSTOMER.to_owned(), OTHER_CUSTOMER.to_owned()];
    expected.sort();
    assert_eq!(owners, expected);
}

#[tokio::test]
async fn concurrent_sessions_progress_independently() {
    let (store, runtime) = fixture().await;
    let runtime = Arc::new(runtime);

    let mut handles = Vec::new();
    for customer in [CUSTOMER, OTHER_CUSTOMER] {
        let runtime = Arc::clone(&runtime);
        handles.push(tokio::spawn(async move {
            let start = runtime.start_session(Some(customer.to_owned())).await;
            for input in SCENARIO_A {
                runtime.handle_input(&start.session_id, input).await.expect("turn");
            }
            runtime.quick_replies(&start.session_id).await.expect("replies")
        }));
    }

    for handle in handles {
        let replies = handle.await.expect("task");
        assert_eq!(replies, vec![labels::CHECK_QUOTE.to_owned()]);
    }
    assert_eq!(store.orders().await.len(), 2);
}

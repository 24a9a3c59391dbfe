use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use printdesk_core::flows::labels;
use printdesk_core::flows::{FlowRegistry, FlowServices, FlowSettings, Locus, NegotiationStage, Turn};
use printdesk_core::store::OrderStore;
use printdesk_core::{
    ConversationContext, CustomerId, InMemoryAuditSink, OrderStatus, Quote, QuoteId,
};
use printdesk_db::fixtures::DEMO_CUSTOMER_ID;
use printdesk_db::{connect_with_settings, migrations, CatalogSeed, SqlDataStore};

type FlowTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

async fn seeded_registry() -> FlowTestResult<(Arc<SqlDataStore>, Arc<InMemoryAuditSink>, FlowRegistry)> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|err| format!("connect: {err}"))?;
    migrations::run_pending(&pool).await.map_err(|err| format!("migrate: {err}"))?;
    CatalogSeed::load(&pool).await.map_err(|err| format!("seed: {err}"))?;

    let store = Arc::new(SqlDataStore::new(pool));
    let audit = Arc::new(InMemoryAuditSink::default());
    let services = FlowServices::new(Arc::clone(&store), FlowSettings::default(), audit.clone());
    let registry = FlowRegistry::standard(services).map_err(|err| format!("registry: {err}"))?;
    Ok((store, audit, registry))
}

async fn play(registry: &FlowRegistry, mut turn: Turn, inputs: &[&str]) -> Turn {
    for input in inputs {
        turn = registry.respond(turn.context, input).await;
    }
    turn
}

fn last_text(turn: &Turn) -> String {
    turn.messages.last().map(|message| message.text.clone()).unwrap_or_default()
}

#[tokio::test]
async fn order_placed_over_sqlite_is_persisted_and_negotiable() -> FlowTestResult {
    let (store, audit, registry) = seeded_registry().await?;
    let customer = CustomerId::parse(DEMO_CUSTOMER_ID).map_err(|err| err.to_string())?;

    let menu = registry.start(ConversationContext::new(Some(DEMO_CUSTOMER_ID.to_owned()))).await;
    let products = registry.respond(menu.context, labels::PLACE_ORDER).await;
    require!(
        products.quick_replies.starts_with(&[
            "Binding".to_owned(),
            "Large Format".to_owned(),
            "Printing".to_owned()
        ]),
        "product roots come from the seeded catalog, got {:?}",
        products.quick_replies
    );

    let placed = play(
        &registry,
        products,
        &["Printing", "Flyers", "Glossy", "A3", "500 pcs", labels::CONFIRM_ORDER],
    )
    .await;
    require!(
        placed.quick_replies == vec![labels::CHECK_QUOTE.to_owned()],
        "a new order waits for its quote, got {:?}",
        placed.quick_replies
    );

    let orders = store
        .list_orders_for_customer(&customer, 5)
        .await
        .map_err(|err| format!("list orders: {err}"))?;
    require!(orders.len() == 1, "exactly one order row, got {}", orders.len());
    let order = &orders[0];
    require!(order.service_name == "Flyers", "service name stored, got {}", order.service_name);
    require!(order.quantity == 500, "quantity parsed from label, got {}", order.quantity);
    require!(order.status == OrderStatus::Pending, "new orders are pending");

    let pending = registry.respond(placed.context, labels::CHECK_QUOTE).await;
    require!(
        pending.quick_replies == vec![labels::CHECK_QUOTE.to_owned()],
        "no quote yet keeps the customer waiting"
    );

    store
        .insert_quote(&Quote {
            id: QuoteId("quote-sql-1".to_owned()),
            order_id: order.id.clone(),
            initial_price: Decimal::new(2_450, 0),
            negotiated_price: None,
            issued_at: Utc::now(),
            due_at: Utc::now() + Duration::days(5),
        })
        .await
        .map_err(|err| format!("insert quote: {err}"))?;

    let reviewing = registry.respond(pending.context, labels::CHECK_QUOTE).await;
    require!(
        last_text(&reviewing).contains("2450.00"),
        "rendered quote shows the price, got {}",
        last_text(&reviewing)
    );
    require!(
        matches!(&reviewing.context.locus, Locus::Negotiating(state) if state.stage == NegotiationStage::Reviewing),
        "checking a ready quote opens the review"
    );

    let accepted = registry.respond(reviewing.context, labels::ACCEPT_QUOTE).await;
    let stored = store
        .find_order(&order.id, &customer)
        .await
        .map_err(|err| format!("find order: {err}"))?
        .ok_or_else(|| "order disappeared".to_owned())?;
    require!(
        stored.status == OrderStatus::AwaitingPayment,
        "accepting moves the row to awaiting payment, got {:?}",
        stored.status
    );
    require!(
        matches!(&accepted.context.locus, Locus::Negotiating(state) if state.stage == NegotiationStage::Accepted),
        "conversation reflects acceptance"
    );
    require!(
        audit.events().iter().any(|event| event.event_type == "order.submitted"),
        "submission is audited"
    );

    Ok(())
}

#[tokio::test]
async fn anonymous_visitor_cannot_submit_an_order() -> FlowTestResult {
    let (store, _audit, registry) = seeded_registry().await?;

    let menu = registry.start(ConversationContext::new(None)).await;
    let products = registry.respond(menu.context, labels::PLACE_ORDER).await;
    let attempted = play(
        &registry,
        products,
        &["Printing", "Posters", "Matte", "A4", "50 pcs", labels::CONFIRM_ORDER],
    )
    .await;

    require!(
        last_text(&attempted).to_lowercase().contains("sign in"),
        "visitor is asked to sign in, got {}",
        last_text(&attempted)
    );
    let demo = CustomerId::parse(DEMO_CUSTOMER_ID).map_err(|err| err.to_string())?;
    let orders = store
        .list_orders_for_customer(&demo, 5)
        .await
        .map_err(|err| format!("list orders: {err}"))?;
    require!(orders.is_empty(), "nothing is written without a customer");
    Ok(())
}

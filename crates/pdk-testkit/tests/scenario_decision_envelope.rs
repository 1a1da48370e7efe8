//! Scenario: every path through a trading day returns a decision that
//! serializes with all four envelope keys.

use std::sync::Arc;
use std::time::Duration;

use pdk_agent::{
    agent_settings, TradingAgent, GENERATION_FAILED_SUMMARY, INPUT_ERROR_SUMMARY,
};
use pdk_md::MarketDay;
use pdk_schemas::{Order, OrderAction, TradingDecision};
use pdk_testkit::{date, decision_json, fixture_config, fixture_store, ScriptedOracle};

fn assert_envelope(d: &TradingDecision) {
    let v = serde_json::to_value(d).unwrap();
    for key in ["timestamp", "orders", "portfolioUpdates", "diagnostics"] {
        assert!(v.get(key).is_some(), "missing {key} in {v}");
    }
    assert!(v["orders"].is_array());
}

#[tokio::test]
async fn every_outcome_is_well_formed() {
    let cfg = fixture_config(&[]).unwrap();
    let store = fixture_store().unwrap();
    let mut settings = agent_settings(&cfg, &cfg.strategies[0]).unwrap();
    settings.oracle_timeout = Duration::from_millis(50);

    let fenced = format!(
        "Here is my plan:\n```json\n{}\n```\nGood luck.",
        decision_json(&[Order::market(OrderAction::Buy, "TCS", 1, 3720.0, 0.9)], "fenced")
    );
    let oracle = ScriptedOracle::new("alpha")
        .reply(fenced)
        .reply("not json at all")
        .fail("connection reset by peer")
        .delayed(Duration::from_millis(500), decision_json(&[], "too late"));
    let mut agent = TradingAgent::new(Arc::new(oracle), settings).unwrap();

    let day = store.day(date(2024, 3, 1), 2);

    let ok = agent.process_trading_day(&day).await;
    assert_envelope(&ok);
    assert_eq!(ok.orders.len(), 1);
    assert_eq!(ok.timestamp, "2024-03-01");

    let unparseable = agent.process_trading_day(&day).await;
    assert_envelope(&unparseable);
    assert_eq!(unparseable.diagnostics.summary, GENERATION_FAILED_SUMMARY);

    let transport = agent.process_trading_day(&day).await;
    assert_envelope(&transport);
    assert_eq!(transport.diagnostics.summary, GENERATION_FAILED_SUMMARY);

    let timed_out = agent.process_trading_day(&day).await;
    assert_envelope(&timed_out);
    assert!(timed_out.diagnostics.rule_violations[0].starts_with("timeout:"));

    let empty = agent
        .process_trading_day(&MarketDay::new(date(2024, 3, 2)))
        .await;
    assert_envelope(&empty);
    assert_eq!(empty.diagnostics.summary, INPUT_ERROR_SUMMARY);

    // Failed days leave the book exactly as the one accepted order left it.
    assert_eq!(agent.ledger().quantity("TCS"), 1);
}

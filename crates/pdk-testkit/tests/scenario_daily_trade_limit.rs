//! Scenario: the daily trade budget caps executions within one day and
//! resets on the next; low-confidence orders never execute.

use std::sync::Arc;

use pdk_agent::{agent_settings, TradingAgent};
use pdk_schemas::{Order, OrderAction};
use pdk_testkit::{date, decision_json, fixture_config, fixture_store, ScriptedOracle};

fn buy(qty: i64, conf: f64) -> Order {
    Order::market(OrderAction::Buy, "INFY", qty, 1620.4, conf)
}

#[tokio::test]
async fn third_buy_is_refused_when_the_limit_is_two() {
    let cfg = fixture_config(&["risk: {max_daily_trades: 2}"]).unwrap();
    let store = fixture_store().unwrap();
    let oracle = ScriptedOracle::new("alpha")
        .reply(decision_json(&[buy(1, 0.9), buy(1, 0.9), buy(1, 0.9)], "ladder in"))
        .reply(decision_json(&[buy(1, 0.9)], "one more"));
    let settings = agent_settings(&cfg, &cfg.strategies[0]).unwrap();
    let mut agent = TradingAgent::new(Arc::new(oracle), settings).unwrap();

    let out = agent.process_trading_day(&store.day(date(2024, 3, 1), 2)).await;
    assert_eq!(out.orders.len(), 2);
    assert_eq!(
        out.diagnostics.rule_violations,
        vec!["max_daily_trades_exceeded".to_string()]
    );
    assert_eq!(agent.daily_trade_count(), 2);
    assert_eq!(agent.ledger().quantity("INFY"), 2);

    let next = agent.process_trading_day(&store.day(date(2024, 3, 4), 2)).await;
    assert_eq!(next.orders.len(), 1);
    assert_eq!(agent.daily_trade_count(), 1);
}

#[tokio::test]
async fn confidence_point_one_is_never_executed() {
    let cfg = fixture_config(&[]).unwrap();
    let store = fixture_store().unwrap();
    let oracle = ScriptedOracle::new("alpha").reply(decision_json(&[buy(5, 0.1)], "hunch"));
    let settings = agent_settings(&cfg, &cfg.strategies[0]).unwrap();
    let mut agent = TradingAgent::new(Arc::new(oracle), settings).unwrap();

    let out = agent.process_trading_day(&store.day(date(2024, 3, 1), 2)).await;
    assert!(out.orders.is_empty());
    assert_eq!(
        out.diagnostics.rule_violations,
        vec!["Confidence below threshold".to_string()]
    );
    assert!(agent.ledger().is_flat());
    assert_eq!(agent.daily_trade_count(), 0);
}

#[tokio::test]
async fn sequential_checks_see_earlier_fills() {
    // 20 TCS @ 3720 = 74,400 each. The first fits under a 0.8 position cap;
    // the second costs more than the 25,600 left.
    let cfg = fixture_config(&[
        "risk: {max_position_pct: 0.8, max_total_exposure_pct: 1.0, min_cash_reserve_pct: 0.0, max_order_value: 80000}",
    ])
    .unwrap();
    let store = fixture_store().unwrap();
    let twenty = Order::market(OrderAction::Buy, "TCS", 20, 3720.0, 0.9);
    let oracle = ScriptedOracle::new("alpha")
        .reply(decision_json(&[twenty.clone(), twenty], "all in"));
    let settings = agent_settings(&cfg, &cfg.strategies[0]).unwrap();
    let mut agent = TradingAgent::new(Arc::new(oracle), settings).unwrap();

    let out = agent.process_trading_day(&store.day(date(2024, 3, 1), 2)).await;
    assert_eq!(out.orders.len(), 1);
    assert_eq!(
        out.diagnostics.rule_violations,
        vec!["Insufficient cash".to_string()]
    );
}

//! Property tests for the feed model invariants

mod common;

use common::{empty_odds_change_xml, odds_change_key};
use feedlink::{ClientEvent, Delivery, ShutdownSignal};
use oddsfeed::domain::market::{dedup, format_specifiers, line_id, parse_specifiers};
use oddsfeed::domain::routing::{encode_routing_key, parse_routing_key};
use oddsfeed::domain::{uid_with_lang, OutcomeResult};
use oddsfeed::{BetStopStage, Body, Lang, Pipeline, Producer, Urn, UrnType};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;

const ROUTED_TYPES: [&str; 10] = [
    "alive",
    "bet_cancel",
    "bet_settlement",
    "bet_stop",
    "fixture_change",
    "odds_change",
    "rollback_bet_cancel",
    "rollback_bet_settlement",
    "snapshot_complete",
    "producer_down",
];

const INTERESTS: [(&str, &str); 5] = [
    ("pre", "live"),
    ("pre", "-"),
    ("-", "live"),
    ("virt", "-"),
    ("-", "-"),
];

fn optional_number() -> impl Strategy<Value = String> {
    prop_oneof![Just("-".to_string()), (0u32..100_000).prop_map(|n| n.to_string())]
}

fn routing_key() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("hi"), Just("lo")],
        prop::sample::select(INTERESTS.to_vec()),
        prop::sample::select(ROUTED_TYPES.to_vec()),
        optional_number(),
        prop_oneof![
            Just("-.-".to_string()),
            (any::<u32>(), prop_oneof![Just("sr:match"), Just("sr:stage"), Just("vf:match")])
                .prop_map(|(id, prefix)| format!("{}.{}", prefix, id)),
        ],
        optional_number(),
    )
        .prop_map(|(priority, (pre, live), kind, sport, event, node)| {
            format!("{}.{}.{}.{}.{}.{}.{}", priority, pre, live, kind, sport, event, node)
        })
}

fn oracle(result: i32, void_factor: f64, dead_heat_factor: f64) -> OutcomeResult {
    match (result, void_factor) {
        (1, v) if v == 0.0 && dead_heat_factor > 0.0 => OutcomeResult::WinWithDeadHeat,
        (1, v) if v == 0.0 => OutcomeResult::Win,
        (0, v) if v == 0.0 => OutcomeResult::Lose,
        (0, v) if v == 1.0 => OutcomeResult::Void,
        (1, v) if v == 0.5 => OutcomeResult::HalfWin,
        (0, v) if v == 0.5 => OutcomeResult::HalfLose,
        _ => OutcomeResult::Unknown,
    }
}

proptest! {
    #[test]
    fn prop_routing_key_round_trip(key in routing_key()) {
        let header = parse_routing_key(&key, 0).unwrap();
        prop_assert_eq!(encode_routing_key(&header), key);
    }

    #[test]
    fn prop_urn_round_trip(kind in prop::sample::select(UrnType::KNOWN.to_vec()), id in any::<u64>()) {
        let urn = Urn::new("sr", kind, id);
        prop_assert_eq!(urn.id(), id);
        prop_assert_eq!(urn.urn_type(), kind);
        prop_assert_eq!(Urn::parse(urn.as_str()).unwrap(), urn);
    }

    #[test]
    fn prop_specifier_round_trip(map in prop::collection::btree_map("[a-z_]{1,8}", "[a-z0-9.+-]{1,6}", 0..6)) {
        let parsed: BTreeMap<String, String> = parse_specifiers(&format_specifiers(&map));
        prop_assert_eq!(parsed, map);
    }

    #[test]
    fn prop_line_id_is_deterministic(s in "[a-z]{1,6}=[0-9.]{1,4}(\\|[a-z]{1,6}=[0-9.]{1,4}){0,3}") {
        prop_assert_eq!(line_id(&s), line_id(&s.clone()));
        prop_assert_eq!(line_id(""), 0);
    }

    #[test]
    fn prop_outcome_result_table(
        result in -1i32..=1,
        void_factor in prop::sample::select(vec![0.0, 0.5, 1.0]),
        dead_heat_factor in prop::sample::select(vec![0.0, 0.5]),
    ) {
        prop_assert_eq!(
            OutcomeResult::derive(result, void_factor, dead_heat_factor),
            oracle(result, void_factor, dead_heat_factor)
        );
    }

    #[test]
    fn prop_dedup_sorted_unique_same_members(ids in prop::collection::vec(0u64..50, 0..40)) {
        let out = dedup(ids.clone());
        prop_assert!(out.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(ids.iter().all(|id| out.contains(id)));
        prop_assert!(out.iter().all(|id| ids.contains(id)));
    }

    #[test]
    fn prop_recovery_timestamp(
        producer in prop::sample::select(Producer::all().collect::<Vec<_>>()),
        last_alive in 1_000_000_000_000i64..2_000_000_000_000,
        age in 0i64..(4 * 24 * 60 * 60 * 1000),
    ) {
        let window = producer.recovery_window();
        let expected = if age < window { last_alive } else { 0 };
        prop_assert_eq!(producer.recovery_timestamp(last_alive, last_alive + age), expected);
        prop_assert_eq!(producer.recovery_timestamp(last_alive, last_alive + window - 1), last_alive);
        prop_assert_eq!(producer.recovery_timestamp(last_alive, last_alive + window), 0);
    }

    #[test]
    fn prop_language_scoped_keys_are_distinct(id in 0u64..(1 << 48)) {
        let keys: Vec<u64> = Lang::all().map(|lang| uid_with_lang(id, lang)).collect();
        prop_assert_eq!(dedup(keys.clone()).len(), keys.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_per_event_order_is_preserved(events in prop::collection::vec(1u64..5, 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let observed = runtime.block_on(async {
            let mut pipeline = Pipeline::new(ShutdownSignal::new(), 8);
            let (events_tx, events_rx) = mpsc::channel(8);
            let rx = pipeline.source(events_rx);
            let mut rx = pipeline.stage(rx, Box::new(BetStopStage::new(&[Lang::En])));
            let (_errors, _tasks) = pipeline.into_parts();

            let feeder = tokio::spawn({
                let events = events.clone();
                async move {
                    for (seq, event_id) in events.into_iter().enumerate() {
                        let delivery = Delivery::new(
                            odds_change_key(event_id),
                            empty_odds_change_xml(event_id, seq as i64),
                        );
                        events_tx.send(ClientEvent::Delivery(delivery)).await.unwrap();
                    }
                }
            });

            let mut observed: HashMap<u64, Vec<i64>> = HashMap::new();
            while let Some(msg) = rx.recv().await {
                if let (Some(event_id), Some(Body::OddsChange(odds))) = (msg.header.event_id, &msg.body) {
                    observed.entry(event_id).or_default().push(odds.timestamp);
                }
            }
            feeder.await.unwrap();
            observed
        });

        let total: usize = observed.values().map(Vec::len).sum();
        prop_assert_eq!(total, events.len());
        for sequence in observed.values() {
            prop_assert!(sequence.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

use scoring::model::{BatchEntry, Prediction};
use scoring::scorers::{RuleBasedScorer, RuleProfile, Scorer};
use serde_json::json;

fn scorer() -> RuleBasedScorer {
    RuleBasedScorer::new(RuleProfile::default())
}

#[tokio::test]
async fn batch_preserves_order_and_count() {
    let scorer = scorer();
    let records = vec![
        json!({ "amount": 20, "card_type": "credit" }),
        json!({ "amount": 6000, "merchant": "cash advance", "time": "03:00", "location": "nigeria" }),
        json!({ "amount": 300, "card_type": "credit" }),
    ];

    let results = scorer.predict_many(&records).await;

    assert_eq!(results.len(), records.len());
    for (index, entry) in results.iter().enumerate() {
        assert_eq!(entry.transaction_id(), index);
    }
    assert_eq!(results[0].prediction(), Some(Prediction::Legitimate));
    assert_eq!(results[1].prediction(), Some(Prediction::Fraud));
    assert_eq!(results[2].prediction(), Some(Prediction::Legitimate));
}

#[tokio::test]
async fn failing_record_does_not_abort_siblings() {
    let scorer = scorer();
    let records = vec![
        json!({ "amount": 20, "card_type": "credit" }),
        json!(42),
        json!({ "amount": 6000, "merchant": "gambling", "time": "02:00", "location": "offshore" }),
    ];

    let results = scorer.predict_many(&records).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_scored());
    assert!(!results[1].is_scored());
    assert!(results[2].is_scored());

    match &results[1] {
        BatchEntry::Failed { transaction_id, error } => {
            assert_eq!(*transaction_id, 1);
            assert!(error.contains("JSON object"));
        }
        other => panic!("expected a failed entry, got {:?}", other),
    }
    assert_eq!(results[2].prediction(), Some(Prediction::Fraud));
}

#[tokio::test]
async fn sibling_scores_match_solo_scoring() {
    let scorer = scorer();
    let clean = json!({ "amount": 1500, "merchant": "grocery store", "card_type": "credit" });

    let solo = scorer
        .predict(&scoring::model::TransactionRecord::from_value(&clean).unwrap())
        .await
        .unwrap();
    let batch = scorer
        .predict_many(&[json!(null), clean.clone()])
        .await;

    match &batch[1] {
        BatchEntry::Scored { result, .. } => {
            assert_eq!(result.risk_score, solo.risk_score);
            assert_eq!(result.prediction, solo.prediction);
        }
        other => panic!("expected a scored entry, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_batch_yields_empty_results() {
    let scorer = scorer();

    let results = scorer.predict_many(&[]).await;

    assert!(results.is_empty());
}

#[tokio::test]
async fn record_without_amount_is_scored_with_defaults() {
    let scorer = scorer();

    let results = scorer
        .predict_many(&[json!({ "merchant": "grocery store", "card_type": "credit" })])
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_scored());
    assert_eq!(results[0].prediction(), Some(Prediction::Legitimate));
}

#[tokio::test]
async fn batch_entries_serialize_with_index_tags() {
    let scorer = scorer();
    let results = scorer
        .predict_many(&[json!({ "amount": 20, "card_type": "credit" }), json!("nope")])
        .await;

    let rendered = serde_json::to_value(&results).unwrap();

    assert_eq!(rendered[0]["transaction_id"], json!(0));
    assert!(rendered[0].get("risk_score").is_some());
    assert_eq!(rendered[1]["transaction_id"], json!(1));
    assert!(rendered[1].get("error").is_some());
    assert!(rendered[1].get("risk_score").is_none());
}

use proptest::prelude::*;

use super::*;
use crate::model::{
    AnnotationRecord, AnnotatorSubmission, GoldStandard, ItemId, Label, LabelCounts,
    PhenomenonMap, PredictedLabel,
};

fn id(raw: &str) -> ItemId {
    ItemId::new(raw).expect("non-empty id")
}

fn submission(language: &str, ratings: &[(&str, PredictedLabel)]) -> AnnotatorSubmission {
    AnnotatorSubmission::new(
        language,
        ratings
            .iter()
            .map(|(item, predicted)| AnnotationRecord::new(id(item), *predicted))
            .collect(),
    )
}

fn gold(labels: &[(&str, Label)]) -> GoldStandard {
    labels
        .iter()
        .map(|(item, label)| (id(item), *label))
        .collect()
}

fn counts(entailment: usize, contradiction: usize, neutral: usize) -> LabelCounts {
    LabelCounts {
        entailment,
        contradiction,
        neutral,
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn evaluate_three_item_scenario() {
    let gold = gold(&[
        ("1", Label::Entailment),
        ("2", Label::Contradiction),
        ("3", Label::Neutral),
    ]);
    let predictions = submission(
        "DE",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Entailment),
            ("3", PredictedLabel::Neutral),
        ],
    );

    let result = evaluate(&gold, &predictions);

    assert!(close(result.accuracy, 2.0 / 3.0));
    let entailment = result.per_label[&Label::Entailment];
    assert!(close(entailment.precision, 0.5));
    assert!(close(entailment.recall, 1.0));
    assert!(close(entailment.f1, 2.0 / 3.0));
    let contradiction = result.per_label[&Label::Contradiction];
    assert_eq!(contradiction.precision, 0.0);
    assert_eq!(contradiction.recall, 0.0);
    assert_eq!(contradiction.f1, 0.0);
    let neutral = result.per_label[&Label::Neutral];
    assert!(close(neutral.precision, 1.0));
    assert!(close(neutral.recall, 1.0));
    assert!(close(neutral.f1, 1.0));
    assert_eq!(result.confusion.dimensions(), (3, 3));
    assert_eq!(result.confusion.rows(), result.confusion.columns());
    assert_eq!(result.confusion.get(1, 0), 1);
    assert_eq!(result.excluded_rate, 0.0);
}

#[test]
fn perfect_predictions_score_one_everywhere_gold_has_labels() {
    let gold = gold(&[
        ("1", Label::Entailment),
        ("2", Label::Entailment),
        ("3", Label::Neutral),
    ]);
    let predictions = submission(
        "AR",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Entailment),
            ("3", PredictedLabel::Neutral),
        ],
    );

    let result = evaluate(&gold, &predictions);
    assert_eq!(result.accuracy, 1.0);
    for label in [Label::Entailment, Label::Neutral] {
        let metrics = result.per_label[&label];
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }
    assert_eq!(result.per_label[&Label::Contradiction].support, 0);
}

#[test]
fn excluded_predictions_leave_precision_and_recall_untouched() {
    let gold = gold(&[("1", Label::Entailment), ("2", Label::Neutral)]);
    let predictions = submission(
        "ES",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Excluded),
            ("9", PredictedLabel::Neutral),
            ("10", PredictedLabel::Excluded),
        ],
    );

    let result = evaluate(&gold, &predictions);
    assert_eq!(result.total_records, 4);
    assert_eq!(result.excluded_count, 1);
    assert_eq!(result.unmatched_count, 2);
    assert_eq!(result.matched_count, 1);
    assert!(close(result.excluded_rate, 0.25));
    assert_eq!(result.accuracy, 1.0);
    assert_eq!(result.per_label[&Label::Neutral].recall, 0.0);
    assert_eq!(result.per_label[&Label::Neutral].support, 0);
}

#[test]
fn submission_without_matches_scores_zero_not_nan() {
    let gold = gold(&[("1", Label::Entailment)]);
    let predictions = submission("PT", &[("1", PredictedLabel::Excluded)]);

    let result = evaluate(&gold, &predictions);
    assert_eq!(result.accuracy, 0.0);
    assert_eq!(result.excluded_rate, 1.0);
    assert_eq!(result.association.chi_square.p_value, 1.0);

    let empty = submission("TH", &[]);
    let result = evaluate(&gold, &empty);
    assert_eq!(result.excluded_rate, 0.0);
    assert_eq!(result.accuracy, 0.0);
}

#[test]
fn weighted_accuracy_uses_matched_counts() {
    let gold = gold(&[
        ("1", Label::Entailment),
        ("2", Label::Entailment),
        ("3", Label::Entailment),
        ("4", Label::Entailment),
    ]);
    let large = evaluate(
        &gold,
        &submission(
            "DE",
            &[
                ("1", PredictedLabel::Entailment),
                ("2", PredictedLabel::Entailment),
                ("3", PredictedLabel::Entailment),
                ("4", PredictedLabel::Neutral),
            ],
        ),
    );
    let small = evaluate(&gold, &submission("AR", &[("1", PredictedLabel::Neutral)]));

    let pooled = weighted_accuracy([&large, &small]).expect("matched records exist");
    assert!(close(pooled, 3.0 / 5.0));
    assert_ne!(pooled, (large.accuracy + small.accuracy) / 2.0);
    assert_eq!(weighted_accuracy(Vec::<&MetricsResult>::new()), None);
}

#[test]
fn missing_language_is_reported_and_not_weighted() {
    let gold = gold(&[("1", Label::Entailment), ("2", Label::Neutral)]);
    let sources = vec![
        LanguageSource::Missing {
            language: "UR".to_string(),
        },
        LanguageSource::Loaded(submission(
            "DE",
            &[
                ("1", PredictedLabel::Entailment),
                ("2", PredictedLabel::Entailment),
            ],
        )),
        LanguageSource::Invalid {
            language: "HI".to_string(),
            reason: "required column `relation` not found".to_string(),
        },
    ];

    let report = evaluate_languages(&gold, &sources);
    let languages = report
        .languages
        .iter()
        .map(|row| row.language.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(languages, vec!["DE", "HI", "UR"]);
    assert!(matches!(report.languages[2].outcome, EvaluationOutcome::Missing));
    assert!(matches!(
        report.languages[1].outcome,
        EvaluationOutcome::Invalid { .. }
    ));
    assert_eq!(report.overall_matched_count, 2);
    assert_eq!(report.overall_accuracy, Some(0.5));
    assert_eq!(
        unavailable_sources(&sources)
            .iter()
            .map(|source| source.language.as_str())
            .collect::<Vec<&str>>(),
        vec!["HI", "UR"]
    );
}

#[test]
fn agreement_scenario_two_of_three() {
    let de = submission("DE", &[("7", PredictedLabel::Entailment)]);
    let ar = submission("AR", &[("7", PredictedLabel::Entailment)]);
    let es = submission("ES", &[("7", PredictedLabel::Neutral)]);

    let report = aggregate(&[&de, &ar, &es]);
    assert_eq!(report.per_item.len(), 1);
    let item = &report.per_item[0];
    assert_eq!(item.item_id, id("7"));
    assert_eq!(item.label_counts, counts(2, 0, 1));
    assert_eq!(item.rater_count, 3);
    assert_eq!(item.dominant_label, Label::Entailment);
    assert_eq!(item.dominant_count, 2);
    assert!((item.agreement_pct - 66.666_666_666).abs() < 1e-6);
    assert_eq!(report.summary.languages, vec!["AR", "DE", "ES"]);
}

#[test]
fn dominant_label_ties_follow_canonical_order() {
    assert_eq!(
        dominant_label(&counts(0, 2, 2)),
        Some((Label::Contradiction, 2))
    );
    assert_eq!(dominant_label(&counts(1, 1, 1)), Some((Label::Entailment, 1)));
    assert_eq!(dominant_label(&counts(0, 0, 3)), Some((Label::Neutral, 3)));
    assert_eq!(dominant_label(&counts(0, 0, 0)), None);

    let first = submission("AR", &[("1", PredictedLabel::Neutral)]);
    let second = submission("DE", &[("1", PredictedLabel::Contradiction)]);
    let forward = aggregate(&[&first, &second]);
    let backward = aggregate(&[&second, &first]);
    assert_eq!(forward, backward);
    assert_eq!(forward.per_item[0].dominant_label, Label::Contradiction);
}

#[test]
fn excluded_ratings_are_dropped_and_empty_items_omitted() {
    let de = submission(
        "DE",
        &[
            ("1", PredictedLabel::Excluded),
            ("2", PredictedLabel::Excluded),
        ],
    );
    let ar = submission(
        "AR",
        &[
            ("1", PredictedLabel::Neutral),
            ("2", PredictedLabel::Excluded),
        ],
    );

    let report = aggregate(&[&de, &ar]);
    assert_eq!(report.per_item.len(), 1);
    assert_eq!(report.per_item[0].item_id, id("1"));
    assert_eq!(report.per_item[0].rater_count, 1);
    assert_eq!(report.per_item[0].excluded_count, 1);
    assert_eq!(report.summary.excluded_rating_count, 3);
    assert_eq!(report.summary.kappa_item_count, 0);
    assert_eq!(report.summary.fleiss_kappa, None);
}

#[test]
fn unanimous_items_give_kappa_of_exactly_one() {
    let items = [counts(3, 0, 0), counts(0, 4, 0), counts(0, 0, 2)];
    assert_eq!(fleiss_kappa(&items), Some(1.0));
}

#[test]
fn single_label_everywhere_leaves_kappa_undefined() {
    let items = [counts(3, 0, 0), counts(2, 0, 0)];
    assert_eq!(fleiss_kappa(&items), None);
}

#[test]
fn kappa_two_item_scenario_is_zero() {
    let items = [counts(3, 0, 0), counts(1, 1, 1)];
    let kappa = fleiss_kappa(&items).expect("kappa defined");
    assert!(kappa.abs() < 1e-12, "kappa={kappa}");
}

#[test]
fn kappa_ignores_single_rater_items() {
    let with_single = [counts(3, 0, 0), counts(1, 1, 1), counts(0, 1, 0)];
    let without = [counts(3, 0, 0), counts(1, 1, 1)];
    assert_eq!(fleiss_kappa(&with_single), fleiss_kappa(&without));
}

#[test]
fn kappa_with_varying_rater_counts() {
    // P_1 = 1, P_2 = (2*1 + 2*1)/(4*3) = 1/3, so P̄ = 2/3
    // p = (4, 2, 0) / 6, so P̄e = (4/6)^2 + (2/6)^2 = 20/36
    let items = [counts(2, 0, 0), counts(2, 2, 0)];
    let observed = 2.0 / 3.0;
    let chance = 20.0 / 36.0;
    let expected = (observed - chance) / (1.0 - chance);
    let kappa = fleiss_kappa(&items).expect("kappa defined");
    assert!(close(kappa, expected), "kappa={kappa} expected={expected}");
}

#[test]
fn empty_agreement_input_is_neutral() {
    let report = aggregate(&[]);
    assert!(report.per_item.is_empty());
    assert_eq!(report.summary.item_count, 0);
    assert_eq!(report.summary.average_agreement_pct, 0.0);
    assert_eq!(report.summary.fleiss_kappa, None);
    assert_eq!(report.summary.chi_square.statistic, 0.0);
    assert_eq!(report.summary.chi_square.p_value, 1.0);
    assert_eq!(report.summary.chi_square.degrees_of_freedom, 2);
}

fn uniform_submission(language: &str, predicted: PredictedLabel, items: usize) -> AnnotatorSubmission {
    AnnotatorSubmission::new(
        language,
        (1..=items)
            .map(|item| AnnotationRecord::new(id(&item.to_string()), predicted))
            .collect(),
    )
}

#[test]
fn agreement_chi_square_pools_all_ratings() {
    let de = uniform_submission("DE", PredictedLabel::Entailment, 10);
    let ar = uniform_submission("AR", PredictedLabel::Contradiction, 10);
    let es = uniform_submission("ES", PredictedLabel::Neutral, 10);

    let report = aggregate(&[&de, &ar, &es]);
    assert_eq!(report.summary.label_totals, counts(10, 10, 10));
    assert_eq!(report.summary.chi_square.statistic, 0.0);
    assert_eq!(report.summary.chi_square.p_value, 1.0);
    assert_eq!(report.summary.fleiss_kappa.map(|kappa| kappa < 0.0), Some(true));
    let ids = report
        .per_item
        .iter()
        .map(|item| item.item_id.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(ids[..3], ["1", "2", "3"]);
    assert_eq!(ids[9], "10");
}

#[test]
fn concentrated_ratings_are_flagged_significant() {
    let de = uniform_submission("DE", PredictedLabel::Entailment, 10);
    let ar = uniform_submission("AR", PredictedLabel::Entailment, 10);
    let es = uniform_submission("ES", PredictedLabel::Entailment, 10);

    let report = aggregate(&[&de, &ar, &es]);
    assert!((report.summary.chi_square.statistic - 60.0).abs() < 1e-12);
    assert!(report.summary.chi_square.is_significant(0.001));
    assert_eq!(report.summary.fleiss_kappa, None);
    assert_eq!(report.summary.average_agreement_pct, 100.0);
}

#[test]
fn phenomenon_breakdown_counts_only_requested_tags() {
    let gold = gold(&[
        ("1", Label::Entailment),
        ("2", Label::Contradiction),
        ("3", Label::Neutral),
        ("4", Label::Neutral),
    ]);
    let phenomena = [(id("1"), "Modality"), (id("2"), "modality"), (id("3"), "conditionality")]
        .into_iter()
        .collect::<PhenomenonMap>();
    let de = submission(
        "DE",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Neutral),
            ("3", PredictedLabel::Excluded),
            ("4", PredictedLabel::Neutral),
        ],
    );

    let requested = vec![
        "modality".to_string(),
        "Conditionality".to_string(),
        "intensionality".to_string(),
    ];
    let rows = breakdown(&gold, &phenomena, &[&de], &requested);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].phenomenon, "modality");
    assert_eq!(rows[0].sample_count, 2);
    assert_eq!(rows[0].matched_count, 1);
    assert!(close(rows[0].accuracy, 0.5));
    assert_eq!(rows[0].label_counts, counts(1, 0, 1));
    assert_eq!(rows[1].phenomenon, "conditionality");
    assert_eq!(rows[1].sample_count, 0);
    assert_eq!(rows[1].accuracy, 0.0);
    assert_eq!(rows[2].sample_count, 0);

    assert_eq!(average_accuracy(&rows), Some(0.5));
    assert_eq!(phenomenon_effect(&rows), None);
}

#[test]
fn unknown_phenomenon_matches_only_when_requested() {
    let gold = gold(&[("1", Label::Entailment), ("2", Label::Neutral)]);
    let phenomena = [(id("1"), "modality")].into_iter().collect::<PhenomenonMap>();
    let de = submission(
        "DE",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Neutral),
        ],
    );

    let rows = breakdown(&gold, &phenomena, &[&de], &["modality".to_string()]);
    assert_eq!(rows[0].sample_count, 1);

    let rows = breakdown(&gold, &phenomena, &[&de], &["unknown".to_string()]);
    assert_eq!(rows[0].sample_count, 1);
    assert_eq!(rows[0].matched_count, 1);

    assert_eq!(
        observed_phenomena(&gold, &phenomena),
        vec!["modality".to_string(), "unknown".to_string()]
    );
}

#[test]
fn breakdown_languages_groups_and_tests_effect() {
    let gold = gold(&[
        ("1", Label::Entailment),
        ("2", Label::Entailment),
        ("3", Label::Neutral),
        ("4", Label::Neutral),
    ]);
    let phenomena = [
        (id("1"), "modality"),
        (id("2"), "modality"),
        (id("3"), "conditionality"),
        (id("4"), "conditionality"),
    ]
    .into_iter()
    .collect::<PhenomenonMap>();
    let de = submission(
        "DE",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Entailment),
            ("3", PredictedLabel::Neutral),
            ("4", PredictedLabel::Neutral),
        ],
    );
    let ar = submission("AR", &[("1", PredictedLabel::Neutral)]);
    let requested = vec!["modality".to_string(), "conditionality".to_string()];

    let rows = breakdown(&gold, &phenomena, &[&de, &ar], &requested);
    let grouped = breakdown_languages(&rows);

    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[0].language, "AR");
    assert_eq!(grouped[0].average_accuracy, Some(0.0));
    assert!(grouped[0].effect.is_none());
    assert_eq!(grouped[1].language, "DE");
    assert_eq!(grouped[1].average_accuracy, Some(1.0));
    let effect = grouped[1].effect.expect("two sampled phenomena");
    assert!((effect.cramers_v - 1.0).abs() < 1e-12);
    assert_eq!(effect.chi_square.degrees_of_freedom, 1);
}

#[test]
fn progress_counts_substantive_annotations() {
    let de = submission(
        "DE",
        &[
            ("1", PredictedLabel::Entailment),
            ("2", PredictedLabel::Excluded),
            ("3", PredictedLabel::Neutral),
        ],
    );
    let row = progress(4, &de);
    assert_eq!(row.annotated, 2);
    assert_eq!(row.total, 4);
    assert!(close(row.progress_pct, 50.0));
    assert_eq!(progress(0, &de).progress_pct, 0.0);
}

fn predicted_strategy() -> impl Strategy<Value = PredictedLabel> {
    prop_oneof![
        Just(PredictedLabel::Entailment),
        Just(PredictedLabel::Contradiction),
        Just(PredictedLabel::Neutral),
        Just(PredictedLabel::Excluded),
    ]
}

fn panel_strategy() -> impl Strategy<Value = Vec<Vec<(u8, PredictedLabel)>>> {
    prop::collection::vec(
        prop::collection::vec((0_u8..12, predicted_strategy()), 0..15),
        0..6,
    )
}

fn panel_submissions(panel: &[Vec<(u8, PredictedLabel)>]) -> Vec<AnnotatorSubmission> {
    panel
        .iter()
        .enumerate()
        .map(|(index, ratings)| {
            AnnotatorSubmission::new(
                format!("L{index}"),
                ratings
                    .iter()
                    .map(|(item, predicted)| AnnotationRecord::new(id(&item.to_string()), *predicted))
                    .collect(),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn label_counts_sum_to_rater_count(panel in panel_strategy()) {
        let submissions = panel_submissions(&panel);
        let refs = submissions.iter().collect::<Vec<&AnnotatorSubmission>>();
        let report = aggregate(&refs);

        for item in &report.per_item {
            prop_assert_eq!(item.label_counts.total(), item.rater_count);
            prop_assert!(item.rater_count >= 1);
            prop_assert!(item.rater_count <= submissions.len());
            prop_assert!(item.agreement_pct > 0.0 && item.agreement_pct <= 100.0);
        }
        if let Some(kappa) = report.summary.fleiss_kappa {
            prop_assert!(kappa <= 1.0 + 1e-12);
        }
        prop_assert!((0.0..=1.0).contains(&report.summary.chi_square.p_value));
    }

    #[test]
    fn weighted_accuracy_stays_between_extremes(panel in panel_strategy()) {
        let gold = (0_u8..12)
            .map(|item| (id(&item.to_string()), Label::Entailment))
            .collect::<GoldStandard>();
        let submissions = panel_submissions(&panel);
        let results = submissions
            .iter()
            .map(|submission| evaluate(&gold, submission))
            .collect::<Vec<MetricsResult>>();

        if let Some(pooled) = weighted_accuracy(&results) {
            let scored = results.iter().filter(|result| result.matched_count > 0);
            let lowest = scored.clone().map(|result| result.accuracy).fold(f64::INFINITY, f64::min);
            let highest = scored.map(|result| result.accuracy).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(pooled >= lowest - 1e-12 && pooled <= highest + 1e-12);
        }
        for result in &results {
            prop_assert!((0.0..=1.0).contains(&result.accuracy));
            prop_assert!((0.0..=1.0).contains(&result.excluded_rate));
        }
    }
}

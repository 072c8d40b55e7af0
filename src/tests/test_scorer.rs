use std::sync::Arc;

use approx::assert_relative_eq;
use itemknn_core::SparseVector;
use log::debug;

use crate::builder::ItemItemScorerBuilder;
use crate::error::ScoringError;
use crate::model::{ItemItemModel, SimilarityMatrixModel};
use crate::neighborhood::ScorerKind;
use crate::normalize::NormalizerKind;
use crate::source::{InMemoryRatingSource, RatingVectorSource};
use crate::tests::init;
use crate::tests::test_data::{
    example_model, example_scorer, example_source, make_random_ratings, make_random_rows,
    qualifying, unique, FailingModel, FailingSource, ITEM_A, ITEM_B, ITEM_C, ITEM_D, ITEM_X, USER,
};

// -------------------- Worked example --------------------

#[test]
fn test_weighted_average_example() {
    init();
    let scorer = example_scorer(0, 1, NormalizerKind::Identity);
    let scores = scorer.score(USER, &[ITEM_X]).unwrap();

    // D is not rated by the user, so only A, B and C contribute
    let expected = (0.8 * 5.0 + 0.6 * 3.0 + 0.1 * 1.0) / (0.8 + 0.6 + 0.1);
    assert_eq!(scores.len(), 1);
    assert_relative_eq!(scores[&ITEM_X], expected, epsilon = 1e-12);
}

#[test]
fn test_example_below_min_neighbors_is_not_scored() {
    let scorer = example_scorer(0, 4, NormalizerKind::Identity);
    let scores = scorer.score(USER, &[ITEM_X]).unwrap();
    assert!(scores.is_empty(), "only 3 qualifying neighbors, got {:?}", scores);

    let details = scorer.score_with_details(USER, &[ITEM_X]).unwrap();
    assert!(details.is_empty());
}

#[test]
fn test_example_min_neighbors_equal_to_size_is_scored() {
    let scorer = example_scorer(0, 3, NormalizerKind::Identity);
    assert!(scorer.score_item(USER, ITEM_X).unwrap().is_some());
}

#[test]
fn test_huge_neighborhood_limit_matches_unlimited() {
    let unlimited = example_scorer(0, 1, NormalizerKind::Identity);
    let huge = example_scorer(i32::MAX, 1, NormalizerKind::Identity);

    let a = unlimited.score_with_details(USER, &[ITEM_X]).unwrap();
    let b = huge.score_with_details(USER, &[ITEM_X]).unwrap();
    assert_eq!(a, b);
    assert_eq!(b.get(ITEM_X).map(|r| r.neighborhood_size), Some(3));
}

#[test]
fn test_example_truncated_neighborhood() {
    let scorer = example_scorer(2, 1, NormalizerKind::Identity);
    let details = scorer.score_with_details(USER, &[ITEM_X]).unwrap();
    let result = details.get(ITEM_X).expect("X is scored");

    assert_eq!(result.neighborhood_size, 2);
    let ids: Vec<i64> = result.neighbors.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![ITEM_A, ITEM_B]);
    assert_relative_eq!(result.neighbor_weight, 1.4, epsilon = 1e-12);
    assert_relative_eq!(result.score, (0.8 * 5.0 + 0.6 * 3.0) / 1.4, epsilon = 1e-12);
}

#[test]
fn test_negative_weights_pull_score_down() {
    let source = example_source();
    let model =
        SimilarityMatrixModel::from_triplets(vec![(ITEM_X, ITEM_A, -0.5), (ITEM_X, ITEM_B, 0.5)]);
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .build(Arc::new(source), Arc::new(model));

    let score = scorer.score_item(USER, ITEM_X).unwrap().unwrap();
    assert_relative_eq!(score, (-0.5 * 5.0 + 0.5 * 3.0) / 1.0, epsilon = 1e-12);
}

#[test]
fn test_mean_centering_matches_identity_for_positive_weights() {
    // weighted average with non-negative weights commutes with a constant shift
    let plain = example_scorer(0, 1, NormalizerKind::Identity);
    let centered = example_scorer(0, 1, NormalizerKind::MeanCentering);

    let a = plain.score_item(USER, ITEM_X).unwrap().unwrap();
    let b = centered.score_item(USER, ITEM_X).unwrap().unwrap();
    assert_relative_eq!(a, b, epsilon = 1e-12);
}

#[test]
fn test_mean_centering_with_negative_weight() {
    let model =
        SimilarityMatrixModel::from_triplets(vec![(ITEM_X, ITEM_A, -0.5), (ITEM_X, ITEM_B, 0.5)]);
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .with_normalizer(NormalizerKind::MeanCentering)
        .build(Arc::new(example_source()), Arc::new(model));

    // mean 3: centered A = 2, B = 0; (-1 + 0) / 1 = -1, then + 3
    let score = scorer.score_item(USER, ITEM_X).unwrap().unwrap();
    assert_relative_eq!(score, 2.0, epsilon = 1e-12);
}

#[test]
fn test_similarity_sum_scorer() {
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .with_scorer(ScorerKind::SimilaritySum)
        .build(Arc::new(example_source()), Arc::new(example_model()));

    let score = scorer.score_item(USER, ITEM_X).unwrap().unwrap();
    assert_relative_eq!(score, 1.5, epsilon = 1e-12);
}

// -------------------- Edge cases --------------------

#[test]
fn test_unknown_user_gets_no_scores() {
    let scorer = example_scorer(0, 0, NormalizerKind::MeanCentering);
    let scores = scorer.score(7, &[ITEM_X, ITEM_A, 555]).unwrap();
    assert!(scores.is_empty());
}

#[test]
fn test_unknown_items_are_skipped() {
    let scorer = example_scorer(0, 0, NormalizerKind::Identity);
    let scores = scorer.score(USER, &[999, ITEM_X, -3]).unwrap();
    assert_eq!(scores.len(), 1);
    assert!(scores.contains_key(&ITEM_X));
}

#[test]
fn test_items_without_rated_neighbors_are_skipped_even_with_zero_min() {
    // D has no similarity row at all; A's row only points at D
    let model_rows = vec![(ITEM_X, ITEM_A, 0.8), (ITEM_A, ITEM_D, 0.4)];
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .with_min_neighbors(0)
        .build(
            Arc::new(example_source()),
            Arc::new(SimilarityMatrixModel::from_triplets(model_rows)),
        );

    let scores = scorer.score(USER, &[ITEM_X, ITEM_A, ITEM_D]).unwrap();
    assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![ITEM_X]);
}

#[test]
fn test_duplicate_requests_are_scored_once() {
    let scorer = example_scorer(0, 1, NormalizerKind::MeanCentering);
    let items = [ITEM_X, ITEM_X, 999, ITEM_X];

    let scores = scorer.score(USER, &items).unwrap();
    let details = scorer.score_with_details(USER, &items).unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(details.len(), 1);
    assert_eq!(details.score(ITEM_X), scores.get(&ITEM_X).copied());
}

#[test]
fn test_empty_request() {
    let scorer = example_scorer(0, 1, NormalizerKind::Identity);
    assert!(scorer.score(USER, &[]).unwrap().is_empty());
    assert!(scorer.score_with_details(USER, &[]).unwrap().is_empty());
}

#[test]
fn test_details_follow_request_order() {
    let source = example_source();
    let model = SimilarityMatrixModel::from_triplets(vec![
        (10, ITEM_A, 0.3),
        (11, ITEM_B, 0.2),
        (12, ITEM_C, 0.9),
    ]);
    let scorer = ItemItemScorerBuilder::new().build(Arc::new(source), Arc::new(model));

    let details = scorer.score_with_details(USER, &[12, 10, 11]).unwrap();
    let order: Vec<i64> = details.iter().map(|r| r.item).collect();
    assert_eq!(order, vec![12, 10, 11]);
}

// -------------------- Collaborator failures --------------------

#[test]
fn test_rating_source_failure_propagates() {
    let scorer =
        ItemItemScorerBuilder::new().build(Arc::new(FailingSource), Arc::new(example_model()));

    match scorer.score(USER, &[ITEM_X]) {
        Err(ScoringError::RatingSource(msg)) => assert!(msg.contains("42")),
        other => panic!("expected rating source error, got {:?}", other),
    }
    assert!(scorer.score_with_details(USER, &[ITEM_X]).is_err());
    assert!(scorer.recommend(USER, 3, None).is_err());
}

#[test]
fn test_model_failure_fails_whole_call() {
    let model = FailingModel {
        inner: SimilarityMatrixModel::from_triplets(vec![
            (ITEM_X, ITEM_A, 0.8),
            (ITEM_D, ITEM_A, 0.5),
        ]),
        broken_item: ITEM_D,
    };
    let scorer = ItemItemScorerBuilder::new().build(Arc::new(example_source()), Arc::new(model));

    // X alone is fine
    assert!(scorer.score(USER, &[ITEM_X]).is_ok());
    // no partial result once D is requested
    let err = scorer.score(USER, &[ITEM_X, ITEM_D]).unwrap_err();
    assert!(matches!(err, ScoringError::Model(_)));
    assert!(err.to_string().contains("corrupt"));
}

// -------------------- Properties on random data --------------------

struct RandomFixture {
    source: Arc<InMemoryRatingSource>,
    model: Arc<SimilarityMatrixModel>,
    rows: std::collections::HashMap<i64, SparseVector>,
    n_users: i64,
    n_items: i64,
}

fn random_fixture(seed: u64) -> RandomFixture {
    let n_users = 25;
    let n_items = 30;
    let rows = make_random_rows(n_items, 0.4, seed);
    let model = SimilarityMatrixModel::from_rows(rows.clone());
    let source = make_random_ratings(n_users, n_items, 0.3, seed + 1);
    RandomFixture {
        source: Arc::new(source),
        model: Arc::new(model),
        rows,
        n_users,
        n_items,
    }
}

#[test]
fn test_unlimited_zero_min_scores_every_item_with_signal() {
    init();
    let fx = random_fixture(11);
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .with_min_neighbors(0)
        .build(fx.source.clone(), fx.model.clone());

    let items: Vec<i64> = (0..fx.n_items).collect();
    for user in 0..fx.n_users {
        let ratings = fx.source.user_rating_vector(user).unwrap();
        let scores = scorer.score(user, &items).unwrap();

        for &item in &items {
            let row = fx.rows.get(&item).cloned().unwrap_or_default();
            let nbrs = qualifying(&row, &ratings);
            let weight: f64 = nbrs.iter().map(|(_, w)| w.abs()).sum();
            let expect_scored = !nbrs.is_empty() && weight > 0.0;
            assert_eq!(
                scores.contains_key(&item),
                expect_scored,
                "user {} item {}",
                user,
                item
            );
        }
    }
}

#[test]
fn test_bounded_neighborhood_holds_largest_weights() {
    let fx = random_fixture(23);
    let items: Vec<i64> = (0..fx.n_items).collect();

    for k in [1, 3, 5] {
        let scorer = ItemItemScorerBuilder::new()
            .with_neighborhood_size(k)
            .with_min_neighbors(1)
            .build(fx.source.clone(), fx.model.clone());

        for user in 0..fx.n_users {
            let ratings = fx.source.user_rating_vector(user).unwrap();
            let details = scorer.score_with_details(user, &items).unwrap();

            for result in details.iter() {
                assert!(result.neighborhood_size <= k as usize);

                let mut expected = qualifying(&fx.rows[&result.item], &ratings);
                expected.sort_by(|a, b| b.1.total_cmp(&a.1));
                expected.truncate(k as usize);
                let expected: Vec<i64> = expected.into_iter().map(|(id, _)| id).collect();
                let got: Vec<i64> = result.neighbors.iter().map(|n| n.id).collect();
                assert_eq!(got, expected, "user {} item {} k {}", user, result.item, k);
            }
        }
    }
}

#[test]
fn test_items_outside_model_never_scored() {
    let fx = random_fixture(5);
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(0)
        .with_min_neighbors(0)
        .build(fx.source.clone(), fx.model.clone());
    let outside: Vec<i64> = (fx.n_items..fx.n_items + 10).collect();

    for user in 0..fx.n_users {
        assert!(scorer.score(user, &outside).unwrap().is_empty());
    }
}

#[test]
fn test_score_and_details_agree() {
    let fx = random_fixture(77);
    let items: Vec<i64> = (-2..fx.n_items + 2).collect();

    for normalizer in [
        NormalizerKind::Identity,
        NormalizerKind::MeanCentering,
        NormalizerKind::MeanVariance { damping: 2.0 },
    ] {
        let scorer = ItemItemScorerBuilder::new()
            .with_neighborhood_size(4)
            .with_min_neighbors(2)
            .with_normalizer(normalizer)
            .build(fx.source.clone(), fx.model.clone());

        for user in 0..fx.n_users {
            let scores = scorer.score(user, &items).unwrap();
            let details = scorer.score_with_details(user, &items).unwrap();

            assert_eq!(scores.len(), details.len());
            for r in details.iter() {
                assert_eq!(scores.get(&r.item).copied(), Some(r.score));
                assert!(r.neighborhood_size >= 2);
            }
            assert_eq!(details.score_map(), scores);
        }
    }
}

#[test]
fn test_batch_scoring_matches_sequential() {
    let fx = random_fixture(31);
    let scorer = ItemItemScorerBuilder::new()
        .with_normalizer(NormalizerKind::MeanCentering)
        .build(fx.source.clone(), fx.model.clone());

    let requests: Vec<(i64, Vec<i64>)> = (0..fx.n_users)
        .map(|user| (user, (0..fx.n_items).rev().collect()))
        .collect();

    let batch = scorer.score_users(&requests).unwrap();
    assert_eq!(batch.len(), requests.len());
    for ((user, items), scores) in requests.iter().zip(batch.iter()) {
        assert_eq!(&scorer.score(*user, items).unwrap(), scores);
    }
}

#[test]
fn test_batch_scoring_fails_on_collaborator_error() {
    let scorer =
        ItemItemScorerBuilder::new().build(Arc::new(FailingSource), Arc::new(example_model()));
    let requests = vec![(1, vec![ITEM_X]), (2, vec![ITEM_X])];
    assert!(scorer.score_users(&requests).is_err());
}

// -------------------- Recommendation --------------------

#[test]
fn test_recommend_excludes_rated_and_orders_best_first() {
    let fx = random_fixture(3);
    let scorer = ItemItemScorerBuilder::new()
        .with_min_neighbors(1)
        .build(fx.source.clone(), fx.model.clone());

    for user in 0..fx.n_users {
        let ratings = fx.source.user_rating_vector(user).unwrap();
        let recs = scorer.recommend(user, 5, None).unwrap();
        debug!("user {} recommendations {:?}", user, recs);

        assert!(recs.len() <= 5);
        assert!(recs.iter().all(|r| !ratings.contains_key(r.id)));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));

        // every recommendation is the score the scorer reports
        let ids: Vec<i64> = recs.iter().map(|r| r.id).collect();
        let scores = scorer.score(user, &ids).unwrap();
        for r in &recs {
            assert_eq!(scores[&r.id], r.score);
        }
    }
}

#[test]
fn test_recommend_with_candidates() {
    let model = SimilarityMatrixModel::from_triplets(vec![
        (10, ITEM_A, 0.9),
        (11, ITEM_C, 0.9),
        (12, ITEM_B, 0.9),
    ]);
    let scorer = ItemItemScorerBuilder::new().build(Arc::new(example_source()), Arc::new(model));

    let recs = scorer.recommend(USER, 2, Some(&[10, 11, 12, ITEM_A])).unwrap();
    let ids: Vec<i64> = recs.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![10, 12]);

    assert!(scorer.recommend(USER, 0, None).unwrap().is_empty());

    let universe = scorer.recommend(USER, 10, None).unwrap();
    let universe_ids: Vec<i64> = universe.iter().map(|r| r.id).collect();
    assert_eq!(unique(&universe_ids), unique(&[10, 11, 12]));
}

#[test]
fn test_recommend_everything_returns_every_scorable_candidate() {
    let fx = random_fixture(5);
    let scorer = ItemItemScorerBuilder::new()
        .with_neighborhood_size(i32::MAX)
        .build(fx.source.clone(), fx.model.clone());

    for user in 0..fx.n_users {
        let ratings = fx.source.user_rating_vector(user).unwrap();
        let unrated: Vec<i64> = fx
            .model
            .item_universe()
            .into_iter()
            .filter(|&item| !ratings.contains_key(item))
            .collect();
        let expected = scorer.score(user, &unrated).unwrap();

        let recs = scorer.recommend(user, usize::MAX, None).unwrap();
        assert_eq!(recs.len(), expected.len());
        assert!(recs.iter().all(|r| expected[&r.id] == r.score));
    }
}

#[test]
fn test_model_universe_covers_rows_and_neighbors() {
    let model = example_model();
    assert_eq!(model.item_universe(), vec![ITEM_A, ITEM_B, ITEM_C, ITEM_D, ITEM_X]);
}

//! End-to-end fills through [`FillService`].

use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use pretty_assertions::assert_eq;

use cubefill::math::Cube;
use cubefill::testing::{InlineExecutor, MemoryLedger, RecordingSink};
use cubefill::{
    BlockPrice, Checkpoint, DEFAULT_TOOL, FillConfig, FillError, FillNotice, FillService,
    FillStatus, FillTask, InsufficientResourceError, MaterialPercent, MemoryWorld, Percent,
    PlacementOutcome, Price, PriceCatalog, ResourceKinds, ResourcePolicy, Selection, UserId,
    WorldSurface as _,
};

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);

struct Host {
    service: FillService,
    ledger: Arc<MemoryLedger>,
    sink: Arc<RecordingSink>,
    executor: InlineExecutor,
}

fn host(config: FillConfig, executor: InlineExecutor) -> Host {
    let ledger = Arc::new(MemoryLedger::new());
    let sink = Arc::new(RecordingSink::new());
    let catalog = PriceCatalog::new(
        Price::from_whole(1),
        [
            BlockPrice::new("stone", Price::from_whole(1)),
            BlockPrice::new("dirt", "0.50".parse().unwrap()),
        ],
    );
    let service = FillService::new(
        Arc::new(catalog),
        ledger.clone(),
        sink.clone(),
        Arc::new(executor.clone()),
        config,
    );
    Host {
        service,
        ledger,
        sink,
        executor,
    }
}

fn select(a: [i32; 3], b: [i32; 3]) -> Selection {
    let mut selection = Selection::new();
    selection.set_first(Cube::from(a));
    selection.set_second(Cube::from(b));
    selection
}

fn stone_and_dirt() -> Vec<MaterialPercent> {
    vec!["stone:75".parse().unwrap(), "dirt:25".parse().unwrap()]
}

#[tokio::test]
async fn small_fill_end_to_end() {
    let host = host(FillConfig::default(), InlineExecutor::new());
    host.ledger.set_balance(ALICE, Price::from_whole(10));
    host.ledger.set_items(ALICE, "stone".into(), 6);
    host.ledger.set_items(ALICE, "dirt".into(), 2);

    let quote = host
        .service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 1, 1]), stone_and_dirt())
        .await
        .unwrap();
    assert_eq!(quote.total().to_string(), "7.00");
    let lines = quote
        .lines()
        .iter()
        .map(|line| (line.material.as_str(), line.count, line.line_total.to_string()))
        .collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![("stone", 6, "6.00".to_owned()), ("dirt", 2, "1.00".to_owned())]
    );

    let job = host.service.confirm(ALICE).await.unwrap();
    assert_eq!(host.ledger.balance(ALICE), Price::from_whole(3));
    assert_eq!(host.ledger.items(ALICE, &"stone".into()), 0);

    let mut world = MemoryWorld::new();
    let outcome = host.service.run_placement(ALICE, job, &mut world).await;

    assert_eq!(outcome, PlacementOutcome::Done { applied: 8 });
    assert_eq!(world.block_count(), 8);
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(
        host.sink.notices_for(ALICE),
        vec![
            FillNotice::QuoteReady(quote),
            FillNotice::CheckingResources,
            FillNotice::PlacementStarted { blocks: 8 },
            FillNotice::PlacementDone { applied: 8 },
        ]
    );
}

#[tokio::test]
async fn insufficient_balance_at_confirmation() {
    let host = host(
        FillConfig {
            policy: ResourcePolicy {
                at_quote: ResourceKinds::empty(),
                at_confirm: ResourceKinds::CURRENCY,
                at_start: ResourceKinds::CURRENCY,
            },
            ..FillConfig::default()
        },
        InlineExecutor::new(),
    );
    host.ledger.set_balance(ALICE, Price::from_whole(5));

    let quote = host
        .service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 1, 1]), stone_and_dirt())
        .await
        .unwrap();
    assert_eq!(quote.total(), Price::from_whole(7));
    let task = host.service.task(ALICE).unwrap();

    let result = host.service.confirm(ALICE).await;

    assert!(matches!(
        result,
        Err(FillError::InsufficientResource(InsufficientResourceError {
            checkpoint: Checkpoint::Confirm,
            lacking: ResourceKinds::CURRENCY,
            ..
        }))
    ));
    assert_eq!(task.status(), FillStatus::Cancelled);
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(host.ledger.debit_count(), 0);
    assert_eq!(host.ledger.balance(ALICE), Price::from_whole(5));
    assert_eq!(
        host.sink.notices_for(ALICE).last(),
        Some(&FillNotice::InsufficientFunds)
    );
}

#[tokio::test]
async fn insufficient_balance_at_quote() {
    let host = host(FillConfig::default(), InlineExecutor::new());
    host.ledger.set_balance(ALICE, Price::from_whole(5));

    let result = host
        .service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 1, 1]), stone_and_dirt())
        .await;

    assert!(matches!(
        result,
        Err(FillError::InsufficientResource(InsufficientResourceError {
            checkpoint: Checkpoint::Quote,
            ..
        }))
    ));
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(
        host.sink.notices_for(ALICE),
        vec![FillNotice::InsufficientFunds]
    );
}

#[tokio::test]
async fn missing_items_at_confirmation() {
    let host = host(FillConfig::default(), InlineExecutor::new());
    host.ledger.set_balance(ALICE, Price::from_whole(10));
    host.ledger.set_items(ALICE, "stone".into(), 6);

    host.service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 1, 1]), stone_and_dirt())
        .await
        .unwrap();
    let result = host.service.confirm(ALICE).await;

    assert!(matches!(
        result,
        Err(FillError::InsufficientResource(InsufficientResourceError {
            checkpoint: Checkpoint::Confirm,
            lacking: ResourceKinds::ITEMS,
            ..
        }))
    ));
    assert_eq!(
        host.sink.notices_for(ALICE).last(),
        Some(&FillNotice::InsufficientItems)
    );
    assert_eq!(host.ledger.debit_count(), 0);
}

#[tokio::test]
async fn cancel_large_fill_between_chunks() {
    let cancel_target: Arc<OnceLock<FillTask>> = Arc::default();
    let executor = InlineExecutor::new().on_yield({
        let cancel_target = cancel_target.clone();
        move |count| {
            if count == 7
                && let Some(task) = cancel_target.get()
            {
                task.cancel();
            }
        }
    });
    let host = host(
        FillConfig {
            chunk_size: NonZeroUsize::new(500).unwrap(),
            ..FillConfig::default()
        },
        executor,
    );
    host.ledger.set_balance(ALICE, Price::from_whole(10_000));
    host.ledger.set_items(ALICE, "stone".into(), 10_000);

    host.service
        .request_fill(
            ALICE,
            DEFAULT_TOOL,
            &select([0, 0, 0], [99, 99, 0]),
            vec![MaterialPercent::new("stone", Percent::HUNDRED)],
        )
        .await
        .unwrap();
    let task = host.service.task(ALICE).unwrap();
    cancel_target.set(task.clone()).unwrap();

    let job = host.service.confirm(ALICE).await.unwrap();
    assert_eq!(job.chunk_count(), 20);

    let mut world = MemoryWorld::new();
    let outcome = host.service.run_placement(ALICE, job, &mut world).await;

    assert_eq!(
        outcome,
        PlacementOutcome::Cancelled {
            applied: 3500,
            remaining: 6500
        }
    );
    assert_eq!(host.executor.yield_count(), 7);
    assert_eq!(world.set_count(), 3500);
    // Exactly the first seven chunks were placed.
    let (placed, unplaced): (Vec<_>, Vec<_>) =
        task.blocks().enumerate().partition(|&(i, _)| i < 3500);
    assert!(placed.iter().all(|&(_, cube)| world.get(cube).unwrap().is_some()));
    assert!(unplaced.iter().all(|&(_, cube)| world.get(cube).unwrap().is_none()));

    assert_eq!(task.status(), FillStatus::Cancelled);
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(
        host.sink.notices_for(ALICE).last(),
        Some(&FillNotice::PlacementCancelled {
            applied: 3500,
            remaining: 6500
        })
    );
}

#[tokio::test]
async fn world_failure_reports_partial_placement() {
    let host = host(
        FillConfig {
            chunk_size: NonZeroUsize::new(4).unwrap(),
            ..FillConfig::default()
        },
        InlineExecutor::new(),
    );
    host.ledger.set_balance(ALICE, Price::from_whole(100));
    host.ledger.set_items(ALICE, "stone".into(), 100);

    host.service
        .request_fill(
            ALICE,
            DEFAULT_TOOL,
            &select([0, 0, 0], [9, 0, 0]),
            vec![MaterialPercent::new("stone", Percent::HUNDRED)],
        )
        .await
        .unwrap();
    let job = host.service.confirm(ALICE).await.unwrap();

    let mut world = MemoryWorld::new();
    world.set_unavailable(Cube::new(5, 0, 0).checked_grid_aab().unwrap());
    let outcome = host.service.run_placement(ALICE, job, &mut world).await;

    let failure = match outcome {
        PlacementOutcome::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!((failure.applied, failure.remaining), (4, 6));
    assert_eq!(world.set_count(), 4);
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(
        host.sink.notices_for(ALICE).last(),
        Some(&FillNotice::PlacementFailed {
            applied: 4,
            remaining: 6
        })
    );
}

#[tokio::test]
async fn users_are_independent() {
    let host = host(FillConfig::default(), InlineExecutor::new());
    for user in [ALICE, BOB] {
        host.ledger.set_balance(user, Price::from_whole(100));
    }

    host.service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 1, 1]), stone_and_dirt())
        .await
        .unwrap();
    host.service
        .request_fill(BOB, DEFAULT_TOOL, &select([5, 5, 5], [6, 6, 6]), stone_and_dirt())
        .await
        .unwrap();

    assert!(host.service.cancel(ALICE));
    assert!(host.service.task(ALICE).is_none());
    assert_eq!(
        host.service.task(BOB).map(|task| task.status()),
        Some(FillStatus::WaitingResponsePrice)
    );
}

#[tokio::test]
async fn new_request_after_finishing() {
    let host = host(FillConfig::default(), InlineExecutor::new());
    host.ledger.set_balance(ALICE, Price::from_whole(100));
    host.ledger.set_items(ALICE, "stone".into(), 100);
    let stone = || vec![MaterialPercent::new("stone", Percent::HUNDRED)];

    host.service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [1, 0, 0]), stone())
        .await
        .unwrap();
    let job = host.service.confirm(ALICE).await.unwrap();
    host.service
        .run_placement(ALICE, job, &mut MemoryWorld::new())
        .await;

    let quote = host
        .service
        .request_fill(ALICE, DEFAULT_TOOL, &select([0, 0, 0], [2, 0, 0]), stone())
        .await
        .unwrap();
    assert_eq!(quote.total(), Price::from_whole(3));
}

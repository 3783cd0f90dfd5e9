use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use drill_core::model::{
    InitLevel, Item, ItemCollection, ItemDraft, ItemId, PriorTable, ScopeMode, ScopeSpec,
    StudySettings,
};
use drill_core::time::fixed_now;
use services::{
    Autosave, Clock, SessionError, SessionLoopService, SessionState, StudySession, Turn,
};
use storage::repository::{InMemoryRepository, ItemStore, StorageError};

fn word_list(n: usize) -> ItemCollection {
    ItemCollection::from_drafts((1..=n).map(|i| {
        let day = (i - 1) / 5 + 1;
        ItemDraft::new(format!("word{i}"), format!("meaning{i}")).with_group(format!("day{day}"))
    }))
    .unwrap()
}

fn spec(mode: ScopeMode, raw: &str) -> ScopeSpec {
    ScopeSpec::parse(mode, raw).unwrap()
}

fn service(store: Arc<dyn ItemStore>, settings: StudySettings) -> SessionLoopService {
    SessionLoopService::new(Clock::fixed(fixed_now()), store, settings)
}

/// Store whose saves can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryRepository,
    failing: AtomicBool,
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn load_all(&self) -> Result<ItemCollection, StorageError> {
        self.inner.load_all().await
    }

    async fn save_all(&self, items: &ItemCollection) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk unavailable".into()));
        }
        self.inner.save_all(items).await
    }
}

#[tokio::test]
async fn cold_start_asks_for_rating_before_ranking() {
    let repo = InMemoryRepository::new();
    repo.save_all(&word_list(3)).await.unwrap();
    let svc = service(Arc::new(repo.clone()), StudySettings::default());

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-3"))
        .unwrap();

    for expected in 0..3 {
        assert_eq!(session.next_turn(&items), Turn::Rate(ItemId::new(expected)));
        session.rate(&mut items, InitLevel::Unsure).unwrap();
    }
    assert!(matches!(session.next_turn(&items), Turn::Present(_)));
}

#[test]
fn harder_item_is_selected_first() {
    let items = ItemCollection::from_items(vec![
        Item::from_persisted(
            ItemId::new(0),
            "easy".into(),
            "a".into(),
            None,
            0,
            0,
            0,
            Some(InitLevel::VeryFamiliar),
        )
        .unwrap(),
        Item::from_persisted(
            ItemId::new(1),
            "hard".into(),
            "b".into(),
            None,
            2,
            2,
            0,
            Some(InitLevel::Unknown),
        )
        .unwrap(),
    ])
    .unwrap();
    let ids = vec![ItemId::new(0), ItemId::new(1)];

    let mut session =
        StudySession::from_scope(&items, ids, "all", &StudySettings::default(), 0, fixed_now())
            .unwrap();
    assert_eq!(session.next_turn(&items), Turn::Present(ItemId::new(1)));
}

#[tokio::test]
async fn autosave_triggers_every_nth_answer() {
    let repo = InMemoryRepository::new();
    repo.save_all(&word_list(5)).await.unwrap();
    let baseline = repo.save_count();
    let svc = service(Arc::new(repo.clone()), StudySettings::default());

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-5"))
        .unwrap();

    let mut saved_at = Vec::new();
    while session.asked() < 20 {
        match session.next_turn(&items) {
            Turn::Rate(_) => {
                session.rate(&mut items, InitLevel::Unknown).unwrap();
            }
            Turn::Present(_) => {
                session.reveal().unwrap();
                let result = svc
                    .answer_current(&mut session, &mut items, false)
                    .await
                    .unwrap();
                if result.autosave.is_saved() {
                    saved_at.push(result.outcome.asked);
                }
                let saves = repo.save_count() - baseline;
                match result.outcome.asked {
                    1..=9 => assert_eq!(saves, 0),
                    10..=19 => assert_eq!(saves, 1),
                    _ => assert_eq!(saves, 2),
                }
            }
            other => panic!("unexpected turn {other:?}"),
        }
    }

    assert_eq!(saved_at, vec![10, 20]);
    assert!(session.progress().autosaved);
}

#[tokio::test]
async fn finish_saves_and_round_trips_state() {
    let repo = InMemoryRepository::new();
    repo.save_all(&word_list(4)).await.unwrap();
    let svc = service(Arc::new(repo.clone()), StudySettings::default());

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Group, "1"))
        .unwrap();

    let mut answered = 0;
    while answered < 3 {
        match session.next_turn(&items) {
            Turn::Rate(_) => {
                session.rate(&mut items, InitLevel::Familiar).unwrap();
            }
            Turn::Present(_) => {
                session.reveal().unwrap();
                svc.answer_current(&mut session, &mut items, answered % 2 == 0)
                    .await
                    .unwrap();
                answered += 1;
            }
            other => panic!("unexpected turn {other:?}"),
        }
    }

    let report = svc.finish(&mut session, &items).await.unwrap();
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(report.asked(), 3);
    assert_eq!(report.correct(), 2);
    assert_eq!(report.final_step(), 3);
    assert_eq!(report.scope(), "group 1");
    assert_eq!(report.hardest().len(), 4);

    let reloaded = svc.load_collection().await.unwrap();
    assert_eq!(reloaded, items);
    assert_eq!(reloaded.total_tries(), 3);
}

#[tokio::test]
async fn rescoping_twice_picks_the_same_item() {
    let repo = InMemoryRepository::new();
    let mut items = word_list(10);
    for id in 0..10 {
        let level = if id % 3 == 0 {
            InitLevel::Unknown
        } else {
            InitLevel::Familiar
        };
        items.set_init_level(ItemId::new(id), level).unwrap();
    }
    repo.save_all(&items).await.unwrap();
    let svc = service(Arc::new(repo.clone()), StudySettings::default());

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-10"))
        .unwrap();
    for _ in 0..4 {
        assert!(matches!(session.next_turn(&items), Turn::Present(_)));
        session.reveal().unwrap();
        svc.answer_current(&mut session, &mut items, false)
            .await
            .unwrap();
    }

    let day2 = spec(ScopeMode::Group, "2");
    svc.rescope(&mut session, &items, &day2).await.unwrap();
    assert_eq!(session.cur_step(), 4);
    assert_eq!(session.asked(), 0);
    let first = session.next_turn(&items);

    svc.rescope(&mut session, &items, &day2).await.unwrap();
    let second = session.next_turn(&items);

    assert_eq!(first, second);
    assert!(matches!(first, Turn::Present(id) if id.index() >= 5));
}

#[tokio::test]
async fn rescope_to_empty_scope_keeps_old_session() {
    let repo = InMemoryRepository::new();
    repo.save_all(&word_list(3)).await.unwrap();
    let svc = service(Arc::new(repo), StudySettings::default());

    let items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-3"))
        .unwrap();
    let err = svc
        .rescope(&mut session, &items, &spec(ScopeMode::Group, "40-50"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::EmptyScope));
    assert_eq!(session.label(), "position 1-3");
}

#[tokio::test]
async fn failed_saves_are_recoverable() {
    let store = Arc::new(FlakyStore::default());
    store.inner.save_all(&word_list(3)).await.unwrap();
    let settings = StudySettings::new(PriorTable::default(), 3.0, 1, 10).unwrap();
    let svc = service(store.clone(), settings);

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-3"))
        .unwrap();
    while let Turn::Rate(_) = session.next_turn(&items) {
        session.rate(&mut items, InitLevel::Unknown).unwrap();
    }

    store.failing.store(true, Ordering::SeqCst);
    session.reveal().unwrap();
    let result = svc
        .answer_current(&mut session, &mut items, true)
        .await
        .unwrap();
    assert!(matches!(result.autosave, Autosave::Failed(_)));
    assert_eq!(items.total_tries(), 1);

    let err = svc
        .rescope(&mut session, &items, &spec(ScopeMode::Position, "1"))
        .await
        .unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(session.label(), "position 1-3");
    assert_eq!(session.asked(), 1);

    let err = svc.finish(&mut session, &items).await.unwrap_err();
    assert!(err.is_recoverable());

    store.failing.store(false, Ordering::SeqCst);
    let report = svc.finish(&mut session, &items).await.unwrap();
    assert_eq!(report.asked(), 1);
    assert_eq!(store.load_all().await.unwrap().total_tries(), 1);
}

#[tokio::test]
async fn autosave_disabled_still_saves_on_finish() {
    let repo = InMemoryRepository::new();
    repo.save_all(&word_list(2)).await.unwrap();
    let settings = StudySettings::new(PriorTable::default(), 3.0, 0, 10).unwrap();
    let svc = service(Arc::new(repo.clone()), settings);

    let mut items = svc.load_collection().await.unwrap();
    let mut session = svc
        .start_session(&items, &spec(ScopeMode::Position, "1-2"))
        .unwrap();
    while let Turn::Rate(_) = session.next_turn(&items) {
        session.rate(&mut items, InitLevel::Unknown).unwrap();
    }
    session.reveal().unwrap();
    let result = svc
        .answer_current(&mut session, &mut items, false)
        .await
        .unwrap();
    assert!(matches!(result.autosave, Autosave::NotDue));
    assert_eq!(repo.save_count(), 1);

    svc.finish(&mut session, &items).await.unwrap();
    assert_eq!(repo.save_count(), 2);
}

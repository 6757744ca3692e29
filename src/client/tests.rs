use super::browse::{parse_command, run, Command};
use super::runtime::spawn_reporting;
use super::store::{parse_date_input, reduce};
use super::*;
use crate::api::types::PageResponse;
use crate::api::{create_router, AppState};
use crate::database::{Character, Database, Episode, EpisodeCharacterLink, OrderColumn, OrderSpec};
use crate::query::FilterSpec;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const NOW: i64 = 1_700_000_000_000;

fn episode(id: i64) -> Episode {
    Episode {
        id,
        title: format!("Episode {}", id),
        air_date: id * 1000,
        episode_code: format!("S01E{:02}", id),
    }
}

fn started_store() -> (Store, u64) {
    let mut store = Store::with_clock(|| NOW);
    let effects = store.start();
    let seq = match effects.as_slice() {
        [Effect::FetchPage { seq, .. }] => *seq,
        other => panic!("unexpected effects {:?}", other),
    };
    (store, seq)
}

fn loaded_store(count: i64) -> (Store, u64) {
    let (mut store, seq) = started_store();
    store.dispatch(Action::PageLoaded {
        seq,
        response: PageResponse::Ok {
            pages: count,
            episodes: (1..=count.min(15)).map(episode).collect(),
        },
    });
    (store, seq)
}

// =========================================================================
// Reducer
// =========================================================================

#[test]
fn test_start_fetches_default_query() {
    let mut store = Store::with_clock(|| NOW);
    let effects = store.start();
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            seq: 1,
            query: PageQuery {
                page: 1,
                order: OrderSpec::EpisodeAsc,
                filter: FilterSpec::new("", 0, NOW),
            },
        }]
    );
}

#[test]
fn test_page_loaded_requests_characters_and_count() {
    let (mut store, seq) = started_store();
    let effects = store.dispatch(Action::PageLoaded {
        seq,
        response: PageResponse::Ok {
            pages: 2,
            episodes: vec![episode(1), episode(2)],
        },
    });
    assert_eq!(
        effects,
        vec![
            Effect::FetchCharacters { seq, episode_id: 1 },
            Effect::FetchCharacters { seq, episode_id: 2 },
            Effect::FetchPageCount {
                seq,
                total_matching: 2
            },
        ]
    );
    assert_eq!(store.state().total_matching, 2);
    assert_eq!(store.state().rows.len(), 2);
}

#[test]
fn test_empty_response_still_fetches_count() {
    let (mut store, seq) = started_store();
    let effects = store.dispatch(Action::PageLoaded {
        seq,
        response: PageResponse::Empty {
            pages: 0,
            episodes: vec![],
        },
    });
    assert_eq!(
        effects,
        vec![Effect::FetchPageCount {
            seq,
            total_matching: 0
        }]
    );
    assert!(store.state().rows.is_empty());
}

#[test]
fn test_stale_page_response_is_discarded() {
    let (mut store, first) = started_store();
    let effects = store.dispatch(Action::FilterTitle("rick".into()));
    assert_eq!(effects.len(), 1);
    assert_eq!(store.state().latest_seq(), first + 1);

    let effects = store.dispatch(Action::PageLoaded {
        seq: first,
        response: PageResponse::Ok {
            pages: 1,
            episodes: vec![episode(9)],
        },
    });
    assert!(effects.is_empty());
    assert!(store.state().rows.is_empty());
    assert_eq!(store.state().total_matching, 0);
}

#[test]
fn test_stale_characters_and_count_are_discarded() {
    let (mut store, first) = loaded_store(20);
    store.dispatch(Action::SetOrder(OrderSpec::TitleAsc));

    store.dispatch(Action::CharactersLoaded {
        seq: first,
        episode_id: 1,
        characters: vec![Character {
            id: 1,
            name: "Rick Sanchez".into(),
        }],
    });
    store.dispatch(Action::PageCountLoaded {
        seq: first,
        pages: 2,
    });

    assert!(store.state().rows[0].characters.is_empty());
    assert_eq!(store.state().num_of_pages, 1);
}

#[test]
fn test_navigation_bounds_are_noops() {
    let (mut store, seq) = loaded_store(20);
    assert!(store.dispatch(Action::PreviousPage).is_empty());
    assert_eq!(store.state().current_page, 1);

    // page count not known yet
    assert!(store.dispatch(Action::NextPage).is_empty());

    store.dispatch(Action::PageCountLoaded { seq, pages: 2 });
    let effects = store.dispatch(Action::NextPage);
    assert!(matches!(
        effects.as_slice(),
        [Effect::FetchPage { query, .. }] if query.page == 2
    ));
    assert!(store.dispatch(Action::NextPage).is_empty());
    assert_eq!(store.state().current_page, 2);

    store.dispatch(Action::PreviousPage);
    assert_eq!(store.state().current_page, 1);
}

#[test]
fn test_title_filter_resets_page() {
    let (mut store, seq) = loaded_store(40);
    store.dispatch(Action::PageCountLoaded { seq, pages: 3 });
    store.dispatch(Action::NextPage);
    assert_eq!(store.state().current_page, 2);

    store.dispatch(Action::FilterTitle("Pilot".into()));
    assert_eq!(store.state().current_page, 1);
    assert_eq!(store.state().filter.title_substring, "Pilot");
}

#[test]
fn test_date_filters() {
    let (mut store, seq) = loaded_store(40);
    store.dispatch(Action::PageCountLoaded { seq, pages: 3 });
    store.dispatch(Action::NextPage);

    // rejected input changes nothing
    assert!(store.dispatch(Action::FilterFrom("2017.13.01".into())).is_empty());
    assert_eq!(store.state().current_page, 2);

    let effects = store.dispatch(Action::FilterFrom("2017.12.02".into()));
    assert_eq!(effects.len(), 1);
    assert_eq!(store.state().filter.date_from, 1_512_172_800_000);
    assert_eq!(store.state().current_page, 1);

    store.dispatch(Action::FilterTo("2018.01.01".into()));
    assert_eq!(store.state().filter.date_to, 1_514_764_800_000);

    // clearing resets the bound but not the page
    store.dispatch(Action::PageCountLoaded {
        seq: store.state().latest_seq(),
        pages: 3,
    });
    store.dispatch(Action::NextPage);
    store.dispatch(Action::FilterFrom(String::new()));
    store.dispatch(Action::FilterTo("  ".into()));
    assert_eq!(store.state().filter.date_from, 0);
    assert_eq!(store.state().filter.date_to, NOW);
    assert_eq!(store.state().current_page, 2);
}

#[test]
fn test_parse_date_input() {
    assert_eq!(parse_date_input("2017.12.02"), Some(1_512_172_800_000));
    assert_eq!(parse_date_input("2017-12-02"), Some(1_512_172_800_000));
    assert_eq!(parse_date_input("1999.01.01"), None);
    assert_eq!(parse_date_input("2017.13.01"), None);
    assert_eq!(parse_date_input("2017.02.30"), None);
    assert_eq!(parse_date_input("2017.2.3"), None);
    assert_eq!(parse_date_input(""), None);
}

#[test]
fn test_order_toggles() {
    let (mut store, _) = started_store();
    store.dispatch(Action::ToggleOrder(OrderColumn::Title));
    assert_eq!(store.state().order, OrderSpec::TitleAsc);
    store.dispatch(Action::ToggleOrder(OrderColumn::Title));
    assert_eq!(store.state().order, OrderSpec::TitleDesc);
    store.dispatch(Action::ToggleOrder(OrderColumn::Title));
    assert_eq!(store.state().order, OrderSpec::TitleAsc);
    store.dispatch(Action::ToggleOrder(OrderColumn::Date));
    assert_eq!(store.state().order, OrderSpec::DateAsc);

    // same order again is not a change
    assert!(store.dispatch(Action::SetOrder(OrderSpec::DateAsc)).is_empty());
}

#[test]
fn test_popup_follows_character_fetch() {
    let (mut store, seq) = loaded_store(3);
    store.dispatch(Action::OpenPopup(2));
    assert!(store.state().popup.shown);
    assert_eq!(store.state().popup.episode_code, "S01E02");
    assert!(store.state().popup.characters.is_empty());

    let morty = Character {
        id: 2,
        name: "Morty Smith".into(),
    };
    store.dispatch(Action::CharactersLoaded {
        seq,
        episode_id: 2,
        characters: vec![morty.clone()],
    });
    assert_eq!(store.state().popup.characters, vec![morty.clone()]);
    assert_eq!(store.state().rows[1].characters, vec![morty]);

    store.dispatch(Action::ClosePopup);
    assert!(!store.state().popup.shown);

    // not on this page
    store.dispatch(Action::OpenPopup(99));
    assert!(!store.state().popup.shown);
}

#[test]
fn test_fetch_failed_leaves_state() {
    let (mut store, seq) = loaded_store(3);
    let before = store.state().clone();
    let effects = store.dispatch(Action::FetchFailed {
        seq,
        request: "page".into(),
        reason: "connection refused".into(),
    });
    assert!(effects.is_empty());
    assert_eq!(store.state(), &before);
}

#[test]
fn test_reduce_uses_supplied_clock() {
    let mut state = CatalogState::new(5);
    reduce(&mut state, Action::FilterTo("2017.01.01".into()), 5);
    reduce(&mut state, Action::FilterTo(String::new()), 42);
    assert_eq!(state.filter.date_to, 42);
}

// =========================================================================
// View
// =========================================================================

#[test]
fn test_format_air_date() {
    assert_eq!(format_air_date(1_385_942_400_000), "2013.12.02");
    assert_eq!(format_air_date(0), "1970.01.01");
}

#[test]
fn test_render_empty() {
    let state = CatalogState::new(NOW);
    let text = render(&state);
    assert!(text.starts_with("Episodes (page 1/1)"));
    assert!(text.contains("No episodes matched."));
    assert!(!text.contains("Characters"));
}

#[test]
fn test_render_rows_and_popup() {
    let (mut store, seq) = loaded_store(2);
    store.dispatch(Action::CharactersLoaded {
        seq,
        episode_id: 1,
        characters: vec![Character {
            id: 1,
            name: "Rick Sanchez".into(),
        }],
    });
    store.dispatch(Action::OpenPopup(1));

    let text = render(store.state());
    assert!(text.contains("Episode 1"));
    assert!(text.contains("1970.01.01"));
    assert!(text.contains("S01E02"));
    assert!(text.contains("Characters S01E01"));
    assert!(text.contains("Rick Sanchez"));
    assert!(!text.contains("No episodes matched."));
}

// =========================================================================
// Browse commands
// =========================================================================

#[test]
fn test_parse_command() {
    assert_eq!(parse_command("n"), Ok(Command::Apply(Action::NextPage)));
    assert_eq!(parse_command("p\r\n"), Ok(Command::Apply(Action::PreviousPage)));
    assert_eq!(
        parse_command("t close rick"),
        Ok(Command::Apply(Action::FilterTitle("close rick".into())))
    );
    assert_eq!(
        parse_command("t"),
        Ok(Command::Apply(Action::FilterTitle(String::new())))
    );
    assert_eq!(
        parse_command("from 2017.12.02"),
        Ok(Command::Apply(Action::FilterFrom("2017.12.02".into())))
    );
    assert_eq!(
        parse_command("sort date"),
        Ok(Command::Apply(Action::ToggleOrder(OrderColumn::Date)))
    );
    assert_eq!(parse_command("show 3"), Ok(Command::Show(3)));
    assert_eq!(parse_command("q"), Ok(Command::Quit));
    assert!(parse_command("show 0").is_err());
    assert_eq!(
        parse_command("sort 4"),
        Ok(Command::Apply(Action::SetOrder(OrderSpec::DateDesc)))
    );
    assert!(parse_command("sort 7").is_err());
    assert!(parse_command("sort colour").is_err());
    assert!(parse_command("jump").is_err());
}

// =========================================================================
// Session against a live server
// =========================================================================

async fn spawn_server() -> (String, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
    let mut episodes: Vec<Episode> = (1..=16).map(episode).collect();
    episodes[0].title = "Pilot".into();
    db.insert_episodes(&episodes).unwrap();
    db.insert_characters(&[
        Character {
            id: 1,
            name: "Rick Sanchez".into(),
        },
        Character {
            id: 2,
            name: "Morty Smith".into(),
        },
    ])
    .unwrap();
    db.insert_links(&[
        EpisodeCharacterLink {
            episode_id: 1,
            character_id: 1,
        },
        EpisodeCharacterLink {
            episode_id: 1,
            character_id: 2,
        },
    ])
    .unwrap();

    let app = create_router(AppState::new(Arc::new(db)), None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), temp_dir)
}

fn session(base: &str) -> Session {
    let client = ApiClient::new(base, Duration::from_secs(5)).unwrap();
    Session::new(client, Store::with_clock(|| 100_000))
}

#[tokio::test]
async fn test_session_loads_first_page() {
    let (base, _temp) = spawn_server().await;
    let mut session = session(&base);
    session.start();
    session.settle().await;

    let state = session.state();
    assert_eq!(state.total_matching, 16);
    assert_eq!(state.num_of_pages, 2);
    assert_eq!(state.rows.len(), 15);
    let names: Vec<&str> = state.rows[0]
        .characters
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Rick Sanchez", "Morty Smith"]);
    assert_eq!(session.in_flight(), 0);
}

#[tokio::test]
async fn test_session_navigates_and_filters() {
    let (base, _temp) = spawn_server().await;
    let mut session = session(&base);
    session.start();
    session.settle().await;

    session.dispatch(Action::NextPage);
    session.settle().await;
    assert_eq!(session.state().current_page, 2);
    assert_eq!(session.state().rows.len(), 1);
    assert_eq!(session.state().rows[0].episode.episode_code, "S01E16");

    // percent-encoded on the way out
    session.dispatch(Action::FilterTitle("episode 1".into()));
    session.settle().await;
    assert_eq!(session.state().current_page, 1);
    assert_eq!(session.state().total_matching, 7);
    assert_eq!(session.state().num_of_pages, 1);

    session.dispatch(Action::FilterTitle("nothing like this".into()));
    session.settle().await;
    assert_eq!(session.state().total_matching, 0);
    assert!(session.state().rows.is_empty());
}

#[tokio::test]
async fn test_session_http_error_is_fetch_failure() {
    let (base, _temp) = spawn_server().await;
    // every endpoint under this prefix is a 404
    let mut session = session(&format!("{}/missing", base));
    session.start();
    session.settle().await;

    assert!(session.state().rows.is_empty());
    assert_eq!(session.state().total_matching, 0);
    assert_eq!(session.in_flight(), 0);
}

#[tokio::test]
async fn test_session_shutdown_drops_pending() {
    let (base, _temp) = spawn_server().await;
    let mut session = session(&base);
    session.start();
    session.shutdown();
    assert!(!session.apply_next().await);
    assert!(session.state().rows.is_empty());
}

async fn exploding_fetch() -> Action {
    panic!("fetch blew up")
}

#[tokio::test]
async fn test_panicking_fetch_is_reported_as_failure() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    spawn_reporting(tx, CancellationToken::new(), 7, "page", exploding_fetch());

    match rx.recv().await {
        Some(Action::FetchFailed { seq, request, .. }) => {
            assert_eq!(seq, 7);
            assert_eq!(request, "page");
        }
        other => panic!("unexpected action {:?}", other),
    }
}

#[tokio::test]
async fn test_cancelled_fetch_sends_nothing() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();
    spawn_reporting(tx, cancel, 1, "page", std::future::pending::<Action>());
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_browse_sort_by_code() {
    let (base, _temp) = spawn_server().await;
    let mut session = session(&base);
    let input: &[u8] = b"sort 2\nq\n";
    let mut out = Vec::new();
    run(&mut session, input, &mut out).await.unwrap();

    assert_eq!(session.state().order, OrderSpec::EpisodeDesc);
    assert_eq!(session.state().rows[0].episode.episode_code, "S01E16");
}

#[tokio::test]
async fn test_browse_loop() {
    let (base, _temp) = spawn_server().await;
    let mut session = session(&base);
    let input: &[u8] = b"n\nshow 1\nbogus\nq\nn\n";
    let mut out = Vec::new();
    run(&mut session, input, &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Episodes (page 1/2)"));
    assert!(text.contains("Episodes (page 2/2)"));
    assert!(text.contains("Characters S01E16"));
    assert!(text.contains("Unknown command"));
    assert_eq!(session.state().current_page, 2);
}

#[test]
fn test_client_rejects_bad_base_url() {
    assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    assert!(ApiClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
}

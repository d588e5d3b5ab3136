//! Local mirror of a user's three lists
//!
//! Mutations go to the server first. A confirmed change is applied locally;
//! anything else (no change on the server, a failed call) makes the store
//! reload the affected lists so it never drifts from the server.

use std::collections::VecDeque;

use common::ListKind;
use tracing::{info, warn};

use crate::{
    api::{ListApi, MutationOutcome},
    error::ClientError,
    models::ListedGame,
};

/// Page size used when loading a whole list
pub const PAGE_SIZE: i64 = 500;

/// Load every page of a list, in server order
///
/// Paging stops at the first page shorter than [`PAGE_SIZE`].
pub async fn fetch_all<A: ListApi>(api: &A, kind: ListKind) -> Result<Vec<ListedGame>, ClientError> {
    let mut games = Vec::new();
    let mut offset = 0;

    loop {
        let page = api.fetch_page(kind, PAGE_SIZE, offset).await?;
        let len = page.len() as i64;
        games.extend(page);

        if len < PAGE_SIZE {
            break;
        }
        offset += len;
    }

    Ok(games)
}

/// A transient message for the user, drained by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

impl Notification {
    fn error(action: &str, error: &ClientError) -> Self {
        Self {
            message: format!("Could not {}: {}", action, error),
        }
    }
}

/// The three lists of the signed-in user plus pending notifications
#[derive(Debug)]
pub struct ListStore<A> {
    api: A,
    backlog: Vec<ListedGame>,
    watchlist: Vec<ListedGame>,
    played: Vec<ListedGame>,
    notifications: VecDeque<Notification>,
}

impl<A: ListApi> ListStore<A> {
    /// Empty store; call [`ListStore::refresh_all`] to load it
    pub fn new(api: A) -> Self {
        Self {
            api,
            backlog: Vec::new(),
            watchlist: Vec::new(),
            played: Vec::new(),
            notifications: VecDeque::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn list(&self, kind: ListKind) -> &[ListedGame] {
        match kind {
            ListKind::Backlog => &self.backlog,
            ListKind::Watchlist => &self.watchlist,
            ListKind::Played => &self.played,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<ListedGame> {
        match kind {
            ListKind::Backlog => &mut self.backlog,
            ListKind::Watchlist => &mut self.watchlist,
            ListKind::Played => &mut self.played,
        }
    }

    /// The list currently holding `game_id`, if any
    pub fn kind_of(&self, game_id: i64) -> Option<ListKind> {
        ListKind::ALL
            .into_iter()
            .find(|kind| self.list(*kind).iter().any(|game| game.id == game_id))
    }

    /// Drain pending notifications, oldest first
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Queue an error notification for a failed `action`
    pub fn notify_error(&mut self, action: &str, error: &ClientError) {
        self.notify(Notification::error(action, error));
    }

    fn notify(&mut self, notification: Notification) {
        warn!("{}", notification.message);
        self.notifications.push_back(notification);
    }

    /// Reload one list from the server
    ///
    /// On error the list keeps its previous contents.
    pub async fn refresh(&mut self, kind: ListKind) -> Result<(), ClientError> {
        let games = fetch_all(&self.api, kind).await?;
        info!("Loaded {} games into {}", games.len(), kind);
        *self.list_mut(kind) = games;
        Ok(())
    }

    /// Reload all three lists, keeping the old contents unless all loads succeed
    pub async fn refresh_all(&mut self) -> Result<(), ClientError> {
        let backlog = fetch_all(&self.api, ListKind::Backlog).await?;
        let watchlist = fetch_all(&self.api, ListKind::Watchlist).await?;
        let played = fetch_all(&self.api, ListKind::Played).await?;

        self.backlog = backlog;
        self.watchlist = watchlist;
        self.played = played;
        Ok(())
    }

    /// Reload `kinds`, reporting failures as notifications
    async fn resync(&mut self, kinds: &[ListKind]) {
        for kind in kinds {
            if let Err(e) = self.refresh(*kind).await {
                self.notify(Notification::error(&format!("reload {}", kind), &e));
            }
        }
    }

    /// Move `game` into `kind`, out of whichever list held it
    ///
    /// Returns whether the server applied the change.
    pub async fn add(&mut self, kind: ListKind, game: ListedGame) -> bool {
        match self.api.add(kind, game.id).await {
            Ok(MutationOutcome::Applied) => {
                for other in kind.others() {
                    self.list_mut(other).retain(|g| g.id != game.id);
                }

                let target = self.list_mut(kind);
                if !target.iter().any(|g| g.id == game.id) {
                    let completed = kind.tracks_completion().then_some(false);
                    target.push(ListedGame { completed, ..game });
                }
                true
            }
            Ok(MutationOutcome::NoChange) => {
                self.resync(&ListKind::ALL).await;
                false
            }
            Err(e) => {
                self.notify(Notification::error(
                    &format!("add {} to {}", game.name, kind),
                    &e,
                ));
                self.resync(&ListKind::ALL).await;
                false
            }
        }
    }

    /// Remove `game_id` from `kind`
    ///
    /// Returns whether the server applied the change.
    pub async fn remove(&mut self, kind: ListKind, game_id: i64) -> bool {
        match self.api.remove(kind, game_id).await {
            Ok(MutationOutcome::Applied) => {
                self.list_mut(kind).retain(|g| g.id != game_id);
                true
            }
            Ok(MutationOutcome::NoChange) => {
                self.resync(&[kind]).await;
                false
            }
            Err(e) => {
                self.notify(Notification::error(
                    &format!("remove game {} from {}", game_id, kind),
                    &e,
                ));
                self.resync(&[kind]).await;
                false
            }
        }
    }

    /// Set the completion flag of a played game
    ///
    /// Returns whether the server applied the change.
    pub async fn set_completed(&mut self, game_id: i64, completed: bool) -> bool {
        match self.api.set_completed(game_id, completed).await {
            Ok(MutationOutcome::Applied) => {
                if let Some(game) = self.played.iter_mut().find(|g| g.id == game_id) {
                    game.completed = Some(completed);
                } else {
                    self.resync(&[ListKind::Played]).await;
                }
                true
            }
            Ok(MutationOutcome::NoChange) => {
                self.resync(&[ListKind::Played]).await;
                false
            }
            Err(e) => {
                self.notify(Notification::error(
                    &format!("update game {}", game_id),
                    &e,
                ));
                self.resync(&[ListKind::Played]).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ServerState {
        backlog: Vec<ListedGame>,
        watchlist: Vec<ListedGame>,
        played: Vec<ListedGame>,
        fetch_calls: Vec<(ListKind, i64, i64)>,
        fail_mutations: bool,
        fail_fetches: bool,
    }

    impl ServerState {
        fn list_mut(&mut self, kind: ListKind) -> &mut Vec<ListedGame> {
            match kind {
                ListKind::Backlog => &mut self.backlog,
                ListKind::Watchlist => &mut self.watchlist,
                ListKind::Played => &mut self.played,
            }
        }
    }

    /// In-memory server with the same membership rules as the API
    #[derive(Default)]
    struct FakeApi {
        state: Mutex<ServerState>,
    }

    impl FakeApi {
        fn with_list(kind: ListKind, games: Vec<ListedGame>) -> Self {
            let api = Self::default();
            *api.state.lock().unwrap().list_mut(kind) = games;
            api
        }

        fn server_list(&self, kind: ListKind) -> Vec<ListedGame> {
            self.state.lock().unwrap().list_mut(kind).clone()
        }

        fn fetch_calls(&self) -> Vec<(ListKind, i64, i64)> {
            self.state.lock().unwrap().fetch_calls.clone()
        }

        fn unavailable() -> ClientError {
            ClientError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }
        }
    }

    impl ListApi for FakeApi {
        async fn fetch_page(
            &self,
            kind: ListKind,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<ListedGame>, ClientError> {
            let mut state = self.state.lock().unwrap();
            state.fetch_calls.push((kind, limit, offset));
            if state.fail_fetches {
                return Err(Self::unavailable());
            }
            Ok(state
                .list_mut(kind)
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn add(&self, kind: ListKind, game_id: i64) -> Result<MutationOutcome, ClientError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_mutations {
                return Err(Self::unavailable());
            }
            for other in kind.others() {
                state.list_mut(other).retain(|g| g.id != game_id);
            }
            let list = state.list_mut(kind);
            if list.iter().any(|g| g.id == game_id) {
                return Ok(MutationOutcome::NoChange);
            }
            let mut game = ListedGame::new(game_id, format!("Game {game_id}"));
            game.completed = kind.tracks_completion().then_some(false);
            list.push(game);
            Ok(MutationOutcome::Applied)
        }

        async fn remove(&self, kind: ListKind, game_id: i64) -> Result<MutationOutcome, ClientError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_mutations {
                return Err(Self::unavailable());
            }
            let list = state.list_mut(kind);
            let before = list.len();
            list.retain(|g| g.id != game_id);
            Ok(if list.len() < before {
                MutationOutcome::Applied
            } else {
                MutationOutcome::NoChange
            })
        }

        async fn set_completed(
            &self,
            game_id: i64,
            completed: bool,
        ) -> Result<MutationOutcome, ClientError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_mutations {
                return Err(Self::unavailable());
            }
            match state.played.iter_mut().find(|g| g.id == game_id) {
                Some(game) => {
                    game.completed = Some(completed);
                    Ok(MutationOutcome::Applied)
                }
                None => Ok(MutationOutcome::NoChange),
            }
        }
    }

    fn games(ids: impl IntoIterator<Item = i64>) -> Vec<ListedGame> {
        ids.into_iter()
            .map(|id| ListedGame::new(id, format!("Game {id}")))
            .collect()
    }

    fn ids(games: &[ListedGame]) -> Vec<i64> {
        games.iter().map(|g| g.id).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let api = FakeApi::with_list(ListKind::Backlog, games(0..1200));

        let all = fetch_all(&api, ListKind::Backlog).await.unwrap();

        assert_eq!(ids(&all), (0..1200).collect::<Vec<_>>());
        assert_eq!(
            api.fetch_calls(),
            vec![
                (ListKind::Backlog, 500, 0),
                (ListKind::Backlog, 500, 500),
                (ListKind::Backlog, 500, 1000),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_page_after_full_pages() {
        let api = FakeApi::with_list(ListKind::Played, games(0..1000));

        let all = fetch_all(&api, ListKind::Played).await.unwrap();

        assert_eq!(all.len(), 1000);
        assert_eq!(api.fetch_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_all_short_list_is_one_call() {
        let api = FakeApi::with_list(ListKind::Watchlist, games(0..3));

        let all = fetch_all(&api, ListKind::Watchlist).await.unwrap();

        assert_eq!(ids(&all), vec![0, 1, 2]);
        assert_eq!(api.fetch_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_game_moves_between_lists_then_leaves() {
        let mut store = ListStore::new(FakeApi::default());
        let game = ListedGame::new(42, "Outer Wilds");

        assert!(store.add(ListKind::Backlog, game.clone()).await);
        assert_eq!(store.kind_of(42), Some(ListKind::Backlog));

        assert!(store.add(ListKind::Played, game).await);
        assert_eq!(store.kind_of(42), Some(ListKind::Played));
        assert!(store.list(ListKind::Backlog).is_empty());
        assert_eq!(store.list(ListKind::Played)[0].completed, Some(false));

        assert!(store.remove(ListKind::Played, 42).await);
        assert_eq!(store.kind_of(42), None);
        for kind in ListKind::ALL {
            assert!(store.api().server_list(kind).is_empty());
        }
        assert!(store.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_add_keeps_single_entry() {
        let mut store = ListStore::new(FakeApi::default());
        let game = ListedGame::new(7, "Hades");

        assert!(store.add(ListKind::Watchlist, game.clone()).await);
        assert!(!store.add(ListKind::Watchlist, game).await);

        assert_eq!(ids(store.list(ListKind::Watchlist)), vec![7]);
        assert_eq!(store.api().server_list(ListKind::Watchlist).len(), 1);
    }

    #[tokio::test]
    async fn test_no_change_resyncs_from_server() {
        let api = FakeApi::with_list(ListKind::Played, games([5]));
        let mut store = ListStore::new(api);

        // The local store has not loaded yet, so it does not know about 5
        assert!(!store.add(ListKind::Played, ListedGame::new(5, "Game 5")).await);

        assert_eq!(ids(store.list(ListKind::Played)), vec![5]);
        assert_eq!(store.api().fetch_calls().len(), 3);
        assert!(store.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_notifies_and_resyncs() {
        let api = FakeApi::with_list(ListKind::Backlog, games([1, 2]));
        api.state.lock().unwrap().fail_mutations = true;
        let mut store = ListStore::new(api);

        assert!(!store.add(ListKind::Played, ListedGame::new(1, "Game 1")).await);

        let notifications = store.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("add Game 1 to played"));
        assert_eq!(ids(store.list(ListKind::Backlog)), vec![1, 2]);
        assert!(store.list(ListKind::Played).is_empty());
        assert!(store.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_previous_contents() {
        let api = FakeApi::with_list(ListKind::Backlog, games([1]));
        let mut store = ListStore::new(api);
        store.refresh_all().await.unwrap();
        {
            let mut state = store.api().state.lock().unwrap();
            state.fail_mutations = true;
            state.fail_fetches = true;
        }

        assert!(!store.remove(ListKind::Backlog, 1).await);

        assert_eq!(ids(store.list(ListKind::Backlog)), vec![1]);
        let notifications = store.take_notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications[1].message.contains("reload backlog"));
    }

    #[tokio::test]
    async fn test_remove_missing_game_resyncs_target_only() {
        let mut store = ListStore::new(FakeApi::default());

        assert!(!store.remove(ListKind::Watchlist, 99).await);

        assert_eq!(
            store.api().fetch_calls(),
            vec![(ListKind::Watchlist, PAGE_SIZE, 0)]
        );
    }

    #[tokio::test]
    async fn test_set_completed_updates_played_entry() {
        let mut store = ListStore::new(FakeApi::default());
        store.add(ListKind::Played, ListedGame::new(3, "Celeste")).await;

        assert!(store.set_completed(3, true).await);
        assert_eq!(store.list(ListKind::Played)[0].completed, Some(true));
        assert_eq!(
            store.api().server_list(ListKind::Played)[0].completed,
            Some(true)
        );

        // Not a played game: server reports no change
        assert!(!store.set_completed(4, true).await);
        assert_eq!(ids(store.list(ListKind::Played)), vec![3]);
    }

    #[tokio::test]
    async fn test_refresh_all_is_all_or_nothing() {
        let api = FakeApi::with_list(ListKind::Watchlist, games([8, 9]));
        let mut store = ListStore::new(api);
        store.refresh_all().await.unwrap();
        assert_eq!(ids(store.list(ListKind::Watchlist)), vec![8, 9]);

        store.api().state.lock().unwrap().fail_fetches = true;
        assert!(store.refresh_all().await.is_err());
        assert_eq!(ids(store.list(ListKind::Watchlist)), vec![8, 9]);
    }
}

use std::time::Instant;

use focuslab_types::motivation::MotivationBanner;
use focuslab_types::{Credentials, Day, HabitId, TaskId};
use tokio::task::JoinSet;

use crate::board::{Board, BoardError, SyncOp};
use crate::{ApiClient, ClientError, TokenStore};

/// A logged-in view of the board with background persistence.
///
/// Mutations apply locally and spawn their remote write; call
/// [`Session::settle`] before exiting so none are dropped.
#[derive(Debug)]
pub struct Session {
    api: ApiClient,
    tokens: TokenStore,
    board: Board,
    banner: MotivationBanner,
    pending: JoinSet<()>,
}

impl Session {
    /// Attach to `api`, reusing a saved token when there is one.
    pub fn new(api: ApiClient, tokens: TokenStore) -> Result<Self, ClientError> {
        let saved = tokens.load()?;
        Ok(Self {
            api: api.with_token(saved),
            tokens,
            board: Board::new(),
            banner: MotivationBanner::new(),
            pending: JoinSet::new(),
        })
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.api.has_token()
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub async fn signup(&self, credentials: &Credentials) -> Result<String, ClientError> {
        self.api.signup(credentials).await
    }

    /// Log in and persist the token.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), ClientError> {
        let token = self.api.login(credentials).await?;
        self.tokens.save(&token.access_token)?;
        self.api.set_token(Some(token.access_token));
        tracing::info!(email = %credentials.email, "Logged in");
        Ok(())
    }

    /// Forget the token and local state.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.board.clear();
        self.banner = MotivationBanner::new();
        self.api.set_token(None);
        self.tokens.clear()
    }

    /// Fetch tasks and habits together. A rejected token logs out.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let (tasks, habits) = tokio::join!(self.api.get_tasks(), self.api.get_habits());
        match (tasks, habits) {
            (Ok(tasks), Ok(habits)) => {
                tracing::debug!(tasks = tasks.len(), habits = habits.len(), "Board refreshed");
                self.board.load(tasks, habits);
                Ok(())
            }
            (Err(ClientError::Unauthorized), _) | (_, Err(ClientError::Unauthorized)) => {
                tracing::info!("Token rejected, logging out");
                self.logout()?;
                Err(ClientError::Unauthorized)
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    fn dispatch(&mut self, op: Option<SyncOp>) -> bool {
        let Some(op) = op else {
            return false;
        };
        let api = self.api.clone();
        self.pending.spawn(async move {
            if let Err(e) = op.send(&api).await {
                tracing::warn!(op = op.label(), error = %e, "Sync failed; local state kept");
            }
        });
        true
    }

    /// Returns false when `text` is blank.
    pub fn add_task(&mut self, day: Day, text: &str) -> bool {
        let op = self.board.add_task(day, text);
        self.dispatch(op)
    }

    pub fn toggle_task(&mut self, id: &TaskId) -> bool {
        let op = self.board.toggle_task(id);
        self.dispatch(op)
    }

    pub fn delete_task(&mut self, id: &TaskId) {
        let op = self.board.delete_task(id);
        self.dispatch(Some(op));
    }

    pub fn toggle_habit(&mut self, id: &HabitId, day: Day) -> Result<bool, BoardError> {
        let op = self.board.toggle_habit(id, day)?;
        Ok(self.dispatch(op))
    }

    pub fn rename_habit(&mut self, id: &HabitId, name: &str) -> bool {
        let op = self.board.rename_habit(id, name);
        self.dispatch(op)
    }

    /// Wait for every spawned sync to finish.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Sync task aborted");
            }
        }
    }

    /// Run the motivation trigger for `today` and return the visible message.
    pub async fn check_motivation(&mut self, today: Day) -> Option<&str> {
        let progress = self.board.progress_on(today);
        if let Some(request) = self.banner.observe(progress, Instant::now()) {
            let message = self.api.get_motivation(&request).await;
            self.banner.deliver(message, Instant::now());
        }
        self.banner.quote()
    }

    pub fn dismiss_motivation(&mut self) {
        self.banner.dismiss();
    }
}

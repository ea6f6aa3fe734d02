//! Issue detail view and its lifecycle state machine.
//!
//! Archive, unarchive and delete always go through a confirmation step.
//! The pending action is a plain value held in [`DetailState`]; the pure
//! [`reduce`] function turns actions into [`DetailEffect`]s and
//! [`IssueDetail`] executes those effects against the backend.
//!
//! ```text
//! Viewing --Request*--> Confirming --Confirm--> Submitting --ok/err--> Viewing
//!              \                      \--Cancel--> Viewing
//!               \--guard fails: ShowError, stays Viewing
//! ```

use tracing::debug;

use super::ListRoute;
use crate::api::IssueApi;
use crate::api::service::{self, ARCHIVE_REQUIRES_DONE};
use crate::models::{Issue, IssueId, Role, Status};
use crate::session::{Capability, Session, allows};
use crate::{Error, Result};

/// Mutation awaiting confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingAction {
    #[default]
    None,
    ConfirmArchive(IssueId),
    ConfirmUnarchive(IssueId),
    ConfirmDelete(IssueId),
}

/// Text of a confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

impl PendingAction {
    pub fn prompt(&self, issue_title: &str) -> Option<ConfirmPrompt> {
        let (title, message) = match self {
            PendingAction::None => return None,
            PendingAction::ConfirmArchive(_) => (
                "Archive issue",
                format!(
                    "Archive \"{}\"? It will be hidden from the active lists until restored.",
                    issue_title
                ),
            ),
            PendingAction::ConfirmUnarchive(_) => (
                "Restore issue",
                format!("Restore \"{}\" to the active lists?", issue_title),
            ),
            PendingAction::ConfirmDelete(_) => (
                "Delete issue",
                format!(
                    "Permanently delete \"{}\"? This cannot be undone.",
                    issue_title
                ),
            ),
        };
        Some(ConfirmPrompt {
            title: title.to_string(),
            message,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailPhase {
    #[default]
    Viewing,
    Confirming,
    Submitting,
}

/// Controls offered to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailControl {
    Archive,
    Unarchive,
    Delete,
    ReturnToList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailAction {
    IssueLoaded(Issue),
    LoadFailed(String),
    RequestArchive,
    RequestUnarchive,
    RequestDelete,
    Confirm,
    Cancel,
    MutationSucceeded(String),
    MutationFailed(String),
    ReturnToList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailEffect {
    Prompt(ConfirmPrompt),
    ShowError(String),
    ShowNotice(String),
    Archive(IssueId),
    Unarchive(IssueId),
    Delete(IssueId),
    Reload(IssueId),
    Navigate(ListRoute),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub issue: Option<Issue>,
    pub viewer_role: Option<Role>,
    pub pending: PendingAction,
    pub phase: DetailPhase,
    pub error: Option<String>,
    pub notice: Option<String>,
    /// Where "return to list" goes; the active list when not provided.
    pub return_to: ListRoute,
}

impl DetailState {
    pub fn new(viewer_role: Option<Role>, return_to: Option<ListRoute>) -> Self {
        Self {
            viewer_role,
            return_to: return_to.unwrap_or_default(),
            ..Self::default()
        }
    }

    fn can(&self, capability: Capability) -> bool {
        self.viewer_role.is_some_and(|r| allows(r, capability))
    }

    /// Controls to render. Non-administrators only get "return to list".
    pub fn available_controls(&self) -> Vec<DetailControl> {
        let mut controls = Vec::new();
        if let Some(ref issue) = self.issue {
            if issue.archived {
                if self.can(Capability::UnarchiveIssue) {
                    controls.push(DetailControl::Unarchive);
                }
            } else if self.can(Capability::ArchiveIssue) {
                controls.push(DetailControl::Archive);
            }
            if self.can(Capability::DeleteIssue) {
                controls.push(DetailControl::Delete);
            }
        }
        controls.push(DetailControl::ReturnToList);
        controls
    }

    fn refuse(&mut self, message: impl Into<String>) -> Vec<DetailEffect> {
        let message = message.into();
        self.error = Some(message.clone());
        vec![DetailEffect::ShowError(message)]
    }

    fn ask(&mut self, pending: PendingAction, title: &str) -> Vec<DetailEffect> {
        self.pending = pending;
        self.phase = DetailPhase::Confirming;
        self.error = None;
        pending
            .prompt(title)
            .map(DetailEffect::Prompt)
            .into_iter()
            .collect()
    }
}

/// Advance the state machine.
pub fn reduce(state: &mut DetailState, action: DetailAction) -> Vec<DetailEffect> {
    match action {
        DetailAction::IssueLoaded(issue) => {
            state.issue = Some(issue);
            state.error = None;
            Vec::new()
        }
        DetailAction::LoadFailed(message) => state.refuse(message),
        DetailAction::RequestArchive
        | DetailAction::RequestUnarchive
        | DetailAction::RequestDelete
            if state.phase != DetailPhase::Viewing =>
        {
            Vec::new()
        }
        DetailAction::RequestArchive => {
            let Some(issue) = state.issue.clone() else {
                return Vec::new();
            };
            if !state.can(Capability::ArchiveIssue) {
                return state.refuse("Only administrators can archive issues");
            }
            if issue.archived {
                return state.refuse("The issue is already archived");
            }
            if issue.status != Status::Done {
                return state.refuse(ARCHIVE_REQUIRES_DONE);
            }
            state.ask(PendingAction::ConfirmArchive(issue.id), &issue.title)
        }
        DetailAction::RequestUnarchive => {
            let Some(issue) = state.issue.clone() else {
                return Vec::new();
            };
            if !state.can(Capability::UnarchiveIssue) {
                return state.refuse("Only administrators can restore archived issues");
            }
            if !issue.archived {
                return state.refuse("The issue is not archived");
            }
            state.ask(PendingAction::ConfirmUnarchive(issue.id), &issue.title)
        }
        DetailAction::RequestDelete => {
            let Some(issue) = state.issue.clone() else {
                return Vec::new();
            };
            if !state.can(Capability::DeleteIssue) {
                return state.refuse("Only administrators can delete issues");
            }
            state.ask(PendingAction::ConfirmDelete(issue.id), &issue.title)
        }
        DetailAction::Confirm => {
            if state.phase != DetailPhase::Confirming {
                return Vec::new();
            }
            let effect = match state.pending {
                PendingAction::None => return Vec::new(),
                PendingAction::ConfirmArchive(id) => DetailEffect::Archive(id),
                PendingAction::ConfirmUnarchive(id) => DetailEffect::Unarchive(id),
                PendingAction::ConfirmDelete(id) => DetailEffect::Delete(id),
            };
            state.phase = DetailPhase::Submitting;
            vec![effect]
        }
        DetailAction::Cancel => {
            state.pending = PendingAction::None;
            state.phase = DetailPhase::Viewing;
            Vec::new()
        }
        DetailAction::MutationSucceeded(message) => {
            let completed = std::mem::take(&mut state.pending);
            state.phase = DetailPhase::Viewing;
            state.notice = Some(message.clone());
            let mut effects = vec![DetailEffect::ShowNotice(message)];
            match completed {
                PendingAction::ConfirmArchive(id) | PendingAction::ConfirmUnarchive(id) => {
                    effects.push(DetailEffect::Reload(id));
                }
                PendingAction::ConfirmDelete(_) => {
                    effects.push(DetailEffect::Navigate(state.return_to));
                }
                PendingAction::None => {}
            }
            effects
        }
        DetailAction::MutationFailed(message) => {
            state.pending = PendingAction::None;
            state.phase = DetailPhase::Viewing;
            state.refuse(message)
        }
        DetailAction::ReturnToList => vec![DetailEffect::Navigate(state.return_to)],
    }
}

/// Detail view bound to a backend and a session.
pub struct IssueDetail<'a> {
    api: &'a dyn IssueApi,
    session: &'a Session,
    state: DetailState,
    last_error: Option<Error>,
}

impl<'a> IssueDetail<'a> {
    /// Load issue `id` for display.
    pub fn open(
        api: &'a dyn IssueApi,
        session: &'a Session,
        id: IssueId,
        return_to: Option<ListRoute>,
    ) -> Result<Self> {
        let mut detail = Self {
            api,
            session,
            state: DetailState::new(session.role(), return_to),
            last_error: None,
        };
        let issue = api.get_issue(session, id)?;
        reduce(&mut detail.state, DetailAction::IssueLoaded(issue));
        Ok(detail)
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn issue(&self) -> Option<&Issue> {
        self.state.issue.as_ref()
    }

    pub fn available_controls(&self) -> Vec<DetailControl> {
        self.state.available_controls()
    }

    /// The backend error behind the most recent `ShowError`, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Dispatch an action and run any backend effects it produces.
    ///
    /// Returns the user-facing effects (prompts, messages, navigation).
    pub fn dispatch(&mut self, action: DetailAction) -> Vec<DetailEffect> {
        let mut queue = reduce(&mut self.state, action);
        let mut visible = Vec::new();

        while !queue.is_empty() {
            let effect = queue.remove(0);
            let follow_up = match effect {
                DetailEffect::Archive(_) | DetailEffect::Unarchive(_) | DetailEffect::Delete(_) => {
                    Some(self.run_mutation(&effect))
                }
                DetailEffect::Reload(id) => Some(match self.api.get_issue(self.session, id) {
                    Ok(issue) => DetailAction::IssueLoaded(issue),
                    Err(e) => self.failed(e, DetailAction::LoadFailed),
                }),
                other => {
                    visible.push(other);
                    None
                }
            };
            if let Some(action) = follow_up {
                queue.extend(reduce(&mut self.state, action));
            }
        }
        visible
    }

    fn run_mutation(&mut self, effect: &DetailEffect) -> DetailAction {
        debug!(?effect, "running confirmed mutation");
        let Some(issue) = self.state.issue.clone() else {
            return DetailAction::MutationFailed("No issue loaded".to_string());
        };
        let result = match effect {
            DetailEffect::Archive(_) => service::archive_issue(self.api, self.session, &issue),
            DetailEffect::Unarchive(_) => service::unarchive_issue(self.api, self.session, &issue),
            DetailEffect::Delete(id) => service::delete_issue(self.api, self.session, *id),
            _ => return DetailAction::Cancel,
        };
        match result {
            Ok(message) => DetailAction::MutationSucceeded(message),
            Err(e) => self.failed(e, DetailAction::MutationFailed),
        }
    }

    fn failed(&mut self, error: Error, into: fn(String) -> DetailAction) -> DetailAction {
        let message = error.user_message();
        self.last_error = Some(error);
        into(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeBackend, admin, issue, regular_user};

    fn loaded(role: Role, status: Status, archived: bool) -> DetailState {
        let mut state = DetailState::new(Some(role), None);
        let mut i = issue(7, "Crash on save");
        i.status = status;
        i.archived = archived;
        reduce(&mut state, DetailAction::IssueLoaded(i));
        state
    }

    #[test]
    fn test_archive_not_done_shows_error_without_dialog() {
        let mut state = loaded(Role::Administrator, Status::InProgress, false);
        let effects = reduce(&mut state, DetailAction::RequestArchive);
        assert_eq!(
            effects,
            vec![DetailEffect::ShowError(ARCHIVE_REQUIRES_DONE.to_string())]
        );
        assert_eq!(state.pending, PendingAction::None);
        assert_eq!(state.phase, DetailPhase::Viewing);
    }

    #[test]
    fn test_archive_done_prompts_then_submits() {
        let mut state = loaded(Role::Administrator, Status::Done, false);
        let effects = reduce(&mut state, DetailAction::RequestArchive);
        assert!(matches!(effects.as_slice(), [DetailEffect::Prompt(p)] if p.title == "Archive issue"));
        assert_eq!(state.pending, PendingAction::ConfirmArchive(7));

        let effects = reduce(&mut state, DetailAction::Confirm);
        assert_eq!(effects, vec![DetailEffect::Archive(7)]);
        assert_eq!(state.phase, DetailPhase::Submitting);

        let effects = reduce(&mut state, DetailAction::MutationSucceeded("ok".into()));
        assert_eq!(
            effects,
            vec![
                DetailEffect::ShowNotice("ok".into()),
                DetailEffect::Reload(7)
            ]
        );
        assert_eq!(state.pending, PendingAction::None);
    }

    #[test]
    fn test_cancel_clears_pending() {
        let mut state = loaded(Role::Administrator, Status::Todo, false);
        reduce(&mut state, DetailAction::RequestDelete);
        assert_eq!(state.phase, DetailPhase::Confirming);
        reduce(&mut state, DetailAction::Cancel);
        assert_eq!(state.pending, PendingAction::None);
        assert!(reduce(&mut state, DetailAction::Confirm).is_empty());
    }

    #[test]
    fn test_non_admin_never_offered_or_allowed_actions() {
        for (status, archived) in [(Status::Done, false), (Status::Done, true)] {
            let mut state = loaded(Role::User, status, archived);
            assert_eq!(state.available_controls(), vec![DetailControl::ReturnToList]);
            for action in [
                DetailAction::RequestArchive,
                DetailAction::RequestUnarchive,
                DetailAction::RequestDelete,
            ] {
                let effects = reduce(&mut state, action);
                assert!(matches!(effects.as_slice(), [DetailEffect::ShowError(_)]));
                assert_eq!(state.pending, PendingAction::None);
            }
        }
    }

    #[test]
    fn test_admin_controls_depend_on_archival() {
        let active = loaded(Role::Administrator, Status::Todo, false);
        assert_eq!(
            active.available_controls(),
            vec![
                DetailControl::Archive,
                DetailControl::Delete,
                DetailControl::ReturnToList
            ]
        );
        let archived = loaded(Role::Administrator, Status::Done, true);
        assert_eq!(archived.available_controls()[0], DetailControl::Unarchive);
    }

    #[test]
    fn test_return_to_list_uses_origin_route() {
        let mut state = DetailState::new(Some(Role::User), Some(ListRoute::Archived));
        assert_eq!(
            reduce(&mut state, DetailAction::ReturnToList),
            vec![DetailEffect::Navigate(ListRoute::Archived)]
        );
        let mut state = DetailState::new(Some(Role::User), None);
        assert_eq!(
            reduce(&mut state, DetailAction::ReturnToList),
            vec![DetailEffect::Navigate(ListRoute::Active)]
        );
    }

    #[test]
    fn test_driver_unarchive_reloads_cleared_issue() {
        let backend = FakeBackend::new();
        let archived = backend.seed_archived("Old crash");
        let session = Session::new("t", admin());
        let mut detail =
            IssueDetail::open(&backend, &session, archived.id, Some(ListRoute::Archived)).unwrap();

        let effects = detail.dispatch(DetailAction::RequestUnarchive);
        assert!(matches!(effects.as_slice(), [DetailEffect::Prompt(_)]));
        let effects = detail.dispatch(DetailAction::Confirm);
        assert!(matches!(effects.as_slice(), [DetailEffect::ShowNotice(_)]));

        let issue = detail.issue().unwrap();
        assert!(!issue.archived);
        assert!(issue.archived_at.is_none());
        assert!(issue.archiver.is_none());
    }

    #[test]
    fn test_driver_delete_navigates_back() {
        let backend = FakeBackend::new();
        let i = backend.seed_issue("Remove me", Status::Todo);
        let session = Session::new("t", admin());
        let mut detail = IssueDetail::open(&backend, &session, i.id, None).unwrap();
        detail.dispatch(DetailAction::RequestDelete);
        let effects = detail.dispatch(DetailAction::Confirm);
        assert_eq!(
            effects.last(),
            Some(&DetailEffect::Navigate(ListRoute::Active))
        );
        assert!(backend.issues().is_empty());
    }

    #[test]
    fn test_driver_failed_mutation_keeps_error() {
        let backend = FakeBackend::new();
        let i = backend.seed_issue("Flaky", Status::Done);
        let session = Session::new("t", admin());
        let mut detail = IssueDetail::open(&backend, &session, i.id, None).unwrap();
        detail.dispatch(DetailAction::RequestArchive);
        backend.fail_with("Errore interno del server");
        let effects = detail.dispatch(DetailAction::Confirm);
        assert_eq!(
            effects,
            vec![DetailEffect::ShowError("Errore interno del server".into())]
        );
        assert!(matches!(detail.take_error(), Some(Error::Server { .. })));
        assert_eq!(detail.state().phase, DetailPhase::Viewing);
    }

    #[test]
    fn test_driver_guard_makes_no_request() {
        let backend = FakeBackend::new();
        let i = backend.seed_issue("Open", Status::Todo);
        let session = Session::new("t", regular_user());
        let mut detail = IssueDetail::open(&backend, &session, i.id, None).unwrap();
        let calls = backend.calls();
        detail.dispatch(DetailAction::RequestArchive);
        detail.dispatch(DetailAction::Confirm);
        assert_eq!(backend.calls(), calls);
    }
}

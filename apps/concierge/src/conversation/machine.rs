//! Conversation State Machine: the single owner of a session's conversation.
//!
//! The machine is synchronous and never awaits. Transitions mutate the state
//! and return `Effect`s; the async driver performs them and reports back
//! through `complete` / `location_resolved`. Every upstream call carries a
//! sequence number, and an outcome is applied only if the current view is
//! still waiting on that exact number. Anything else is a stale response and
//! is discarded.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm_client::UpstreamError;
use crate::location::{mentions_locality, Coords, LocationContext};
use crate::models::persona::{CategoryOption, Persona, Suggestion};
use crate::models::recommendation::Recommendation;
use crate::recommendations::classifier::{classify, ErrorKind};
use crate::recommendations::pagination::{append_page, DedupPolicy};
use crate::recommendations::parser::{parse_response, Page, ParseOutcome};
use crate::recommendations::prompt_builder::PromptRequest;
use crate::recommendations::validation::ValidationReport;

pub const NO_NEW_ITEMS_NOTICE: &str = "Não encontrei novas opções para essa busca.";
pub const LOAD_MORE_UNSTRUCTURED_NOTICE: &str =
    "Não consegui carregar mais opções agora. Tente novamente.";

/// Monotonic request sequence number.
pub type Seq = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleScreen {
    Suggestions,
    Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Structured recommendations were recovered.
    Success,
    /// The model answered in free text only.
    Partial,
    /// The upstream call failed.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub outcome: Outcome,
    pub intro_text: String,
    pub recommendations: Vec<Recommendation>,
    pub validation: Option<ValidationReport>,
    pub error_kind: Option<ErrorKind>,
    /// Sequence number of the load-more call in flight, if any.
    pub loading_more: Option<Seq>,
    /// Message about the last load-more that did not add items.
    pub notice: Option<String>,
}

impl ResultView {
    fn new(outcome: Outcome, intro_text: String) -> Self {
        Self {
            outcome,
            intro_text,
            recommendations: Vec::new(),
            validation: None,
            error_kind: None,
            loading_more: None,
            notice: None,
        }
    }
}

/// The current view. Loading and showing results are mutually exclusive by
/// construction; a load-more in flight lives inside `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Idle(IdleScreen),
    Loading { seq: Seq },
    Result(ResultView),
}

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ResolveLocation { generation: u64, coords: Coords },
    Fetch(FetchRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub seq: Seq,
    pub page: Page,
    pub query_text: String,
}

#[derive(Debug, Clone, Default)]
struct LocationState {
    opt_in: bool,
    /// Last coordinates reported by the device.
    coords: Option<Coords>,
    context: LocationContext,
    /// Bumped on every opt-in / opt-out so late lookups can be discarded.
    generation: u64,
    resolving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Suggestions,
    Categories,
    Loading,
    Result,
}

/// Read-only snapshot for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub section_id: String,
    pub view: ViewKind,
    pub outcome: Option<Outcome>,
    pub current_query_text: String,
    pub last_submitted_query_text: String,
    pub intro_text: Option<String>,
    pub recommendations: Vec<Recommendation>,
    pub is_loading_more: bool,
    pub location_opt_in: bool,
    pub location: LocationContext,
    pub error_kind: Option<ErrorKind>,
    pub notice: Option<String>,
    pub validation: Option<ValidationReport>,
}

#[derive(Debug, Clone)]
pub struct ConversationMachine {
    persona: Persona,
    view: View,
    current_query_text: String,
    last_submitted_query_text: String,
    location: LocationState,
    /// Fetch held back until the pending location lookup lands.
    deferred_fetch: Option<FetchRequest>,
    next_seq: Seq,
    dedup: DedupPolicy,
}

impl ConversationMachine {
    pub fn new(persona: Persona, dedup: DedupPolicy) -> Self {
        Self {
            persona,
            view: View::Idle(IdleScreen::Suggestions),
            current_query_text: String::new(),
            last_submitted_query_text: String::new(),
            location: LocationState::default(),
            deferred_fetch: None,
            next_seq: 0,
            dedup,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    // ── User actions ───────────────────────────────────────────────────────

    pub fn set_draft(&mut self, text: &str) {
        self.current_query_text = text.to_string();
    }

    /// Submits `text`, or the current draft when `None`. Blank input is a no-op.
    pub fn submit_free_text(&mut self, text: Option<&str>) -> Vec<Effect> {
        let query = text
            .unwrap_or(&self.current_query_text)
            .trim()
            .to_string();
        if query.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if mentions_locality(&query) {
            debug!("Locality keyword in query, forcing location opt-in");
            effects.extend(self.force_opt_in());
        }
        let fetch = self.start_search(query);
        self.dispatch(effects, fetch)
    }

    pub fn select_suggestion(&mut self, suggestion: &Suggestion) -> Vec<Effect> {
        if suggestion.is_special {
            self.supersede("category picker");
            self.deferred_fetch = None;
            self.view = View::Idle(IdleScreen::Categories);
            return self.force_opt_in().into_iter().collect();
        }
        let fetch = self.start_search(suggestion.query_text());
        self.dispatch(Vec::new(), fetch)
    }

    pub fn select_category(&mut self, category: &CategoryOption) -> Vec<Effect> {
        let place = if self.location.opt_in {
            self.location.context.place_name.clone()
        } else {
            None
        };
        let fetch = self.start_search(category.query_text(place.as_deref()));
        self.dispatch(Vec::new(), fetch)
    }

    /// Requests the next page. No-op unless a result is showing, a query was
    /// submitted and no load-more is already in flight.
    pub fn load_more(&mut self) -> Vec<Effect> {
        if self.last_submitted_query_text.is_empty() {
            return Vec::new();
        }
        let seq = self.next_seq + 1;
        let View::Result(result) = &mut self.view else {
            return Vec::new();
        };
        if result.loading_more.is_some() {
            return Vec::new();
        }

        self.next_seq = seq;
        result.loading_more = Some(seq);
        result.notice = None;
        info!("Load more requested (seq={seq})");

        let fetch = FetchRequest {
            seq,
            page: Page::LoadMore,
            query_text: self.last_submitted_query_text.clone(),
        };
        self.dispatch(Vec::new(), fetch)
    }

    /// Back to the suggestion list from a result or the category picker.
    /// Returns `false` when there was nothing to reset.
    pub fn reset(&mut self) -> bool {
        match self.view {
            View::Result(_) | View::Idle(IdleScreen::Categories) => {
                self.clear_conversation();
                true
            }
            View::Idle(IdleScreen::Suggestions) | View::Loading { .. } => false,
        }
    }

    /// Switches persona. Any change is a hard reset, whatever the current view.
    pub fn set_persona(&mut self, persona: Persona) -> bool {
        if persona == self.persona {
            return false;
        }
        info!(
            "Persona changed {} -> {}, resetting conversation",
            self.persona.section_id, persona.section_id
        );
        self.persona = persona;
        self.clear_conversation();
        true
    }

    /// Explicit opt-in / opt-out toggle, optionally reporting fresh coordinates.
    pub fn set_location(&mut self, enabled: bool, coords: Option<Coords>) -> Vec<Effect> {
        if coords.is_some() {
            self.location.coords = coords;
        }

        if !enabled {
            if self.location.opt_in {
                info!("Location opt-out");
            }
            self.location.opt_in = false;
            self.location.context = LocationContext::default();
            self.location.generation += 1;
            self.location.resolving = false;
            return self.release_deferred().into_iter().collect();
        }

        if self.location.opt_in && coords.is_some() {
            // New coordinates re-resolve within the same opt-in.
            return self.begin_resolution().into_iter().collect();
        }
        self.force_opt_in().into_iter().collect()
    }

    // ── Driver callbacks ───────────────────────────────────────────────────

    /// Builds the prompt request for a fetch issued by this machine, using the
    /// location context as it is now.
    pub fn prompt_request(&self, fetch: &FetchRequest) -> PromptRequest {
        let is_load_more = fetch.page == Page::LoadMore;
        let already_listed = match (&self.view, is_load_more) {
            (View::Result(result), true) => result
                .recommendations
                .iter()
                .filter_map(|r| r.name.clone())
                .collect(),
            _ => Vec::new(),
        };

        PromptRequest {
            persona_title: self.persona.title.clone(),
            persona_role: self.persona.role.clone(),
            section_context: self.persona.section_id.clone(),
            query_text: fetch.query_text.clone(),
            location_context: self.location.opt_in.then(|| self.location.context.clone()),
            is_load_more,
            previous_query_text: is_load_more.then(|| fetch.query_text.clone()),
            already_listed,
        }
    }

    /// True while the view still waits on `seq`.
    pub fn is_current(&self, seq: Seq) -> bool {
        match &self.view {
            View::Loading { seq: waiting } => *waiting == seq,
            View::Result(result) => result.loading_more == Some(seq),
            View::Idle(_) => false,
        }
    }

    /// Applies an upstream outcome. Returns `false` if it was stale and discarded.
    pub fn complete(&mut self, seq: Seq, response: Result<String, UpstreamError>) -> bool {
        if !self.is_current(seq) {
            warn!("Discarding stale upstream response (seq={seq})");
            return false;
        }

        if let View::Result(result) = &mut self.view {
            result.loading_more = None;
            apply_load_more(result, response, self.dedup);
            info!(
                "Load more finished (seq={seq}): {} item(s) total",
                result.recommendations.len()
            );
        } else {
            let result = first_page_result(response);
            info!(
                "Search finished (seq={seq}): {:?}, {} item(s)",
                result.outcome,
                result.recommendations.len()
            );
            self.view = View::Result(result);
        }
        true
    }

    /// Applies a location lookup. `None` means the lookup failed; the context
    /// stays empty. Returns `false` if the lookup belongs to an earlier opt-in.
    pub fn location_resolved(&mut self, generation: u64, context: Option<LocationContext>) -> bool {
        if generation != self.location.generation || !self.location.opt_in {
            debug!("Discarding stale location lookup (generation={generation})");
            return false;
        }
        self.location.resolving = false;
        if let Some(context) = context {
            info!("Location resolved: {:?}", context.label());
            self.location.context = context;
        }
        true
    }

    /// Hands back the fetch that was waiting on a location lookup, if any.
    /// Call after `location_resolved` returns `true`.
    pub fn release_deferred(&mut self) -> Option<Effect> {
        if self.location.resolving {
            return None;
        }
        self.deferred_fetch.take().map(Effect::Fetch)
    }

    pub fn state(&self) -> ConversationState {
        let (view, result) = match &self.view {
            View::Idle(IdleScreen::Suggestions) => (ViewKind::Suggestions, None),
            View::Idle(IdleScreen::Categories) => (ViewKind::Categories, None),
            View::Loading { .. } => (ViewKind::Loading, None),
            View::Result(result) => (ViewKind::Result, Some(result)),
        };

        ConversationState {
            section_id: self.persona.section_id.clone(),
            view,
            outcome: result.map(|r| r.outcome),
            current_query_text: self.current_query_text.clone(),
            last_submitted_query_text: self.last_submitted_query_text.clone(),
            intro_text: result.map(|r| r.intro_text.clone()),
            recommendations: result.map(|r| r.recommendations.clone()).unwrap_or_default(),
            is_loading_more: result.is_some_and(|r| r.loading_more.is_some()),
            location_opt_in: self.location.opt_in,
            location: self.location.context.clone(),
            error_kind: result.and_then(|r| r.error_kind),
            notice: result.and_then(|r| r.notice.clone()),
            validation: result.and_then(|r| r.validation.clone()),
        }
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn start_search(&mut self, query: String) -> FetchRequest {
        self.supersede("new search");
        self.next_seq += 1;
        let seq = self.next_seq;
        info!("Search started (seq={seq}): {query}");

        self.view = View::Loading { seq };
        self.last_submitted_query_text = query.clone();
        self.current_query_text.clear();

        FetchRequest {
            seq,
            page: Page::First,
            query_text: query,
        }
    }

    /// Appends `fetch` to `effects`, unless a lookup started by an earlier
    /// transition is still pending. Then the fetch waits for it, so the prompt
    /// sees the resolved place.
    fn dispatch(&mut self, mut effects: Vec<Effect>, fetch: FetchRequest) -> Vec<Effect> {
        let lookup_in_batch = effects
            .iter()
            .any(|e| matches!(e, Effect::ResolveLocation { .. }));
        if self.location.resolving && !lookup_in_batch {
            debug!("Fetch seq={} waits for the pending location lookup", fetch.seq);
            self.deferred_fetch = Some(fetch);
        } else {
            self.deferred_fetch = None;
            effects.push(Effect::Fetch(fetch));
        }
        effects
    }

    fn supersede(&self, reason: &str) {
        match &self.view {
            View::Loading { seq } => debug!("Superseding search seq={seq} ({reason})"),
            View::Result(ResultView {
                loading_more: Some(seq),
                ..
            }) => debug!("Superseding load-more seq={seq} ({reason})"),
            _ => {}
        }
    }

    fn clear_conversation(&mut self) {
        self.supersede("reset");
        self.deferred_fetch = None;
        self.view = View::Idle(IdleScreen::Suggestions);
        self.current_query_text.clear();
        self.last_submitted_query_text.clear();
    }

    /// Turns location on. Idempotent: an opted-in session with a resolved or
    /// resolving context requests nothing.
    fn force_opt_in(&mut self) -> Option<Effect> {
        if !self.location.opt_in {
            info!("Location opt-in");
            self.location.opt_in = true;
            self.location.context = LocationContext::default();
            self.location.generation += 1;
            self.location.resolving = false;
        } else if self.location.context.is_resolved() || self.location.resolving {
            return None;
        }
        self.begin_resolution()
    }

    fn begin_resolution(&mut self) -> Option<Effect> {
        let Some(coords) = self.location.coords else {
            debug!("Location opted in without device coordinates");
            return None;
        };
        self.location.generation += 1;
        self.location.resolving = true;
        Some(Effect::ResolveLocation {
            generation: self.location.generation,
            coords,
        })
    }
}

fn first_page_result(response: Result<String, UpstreamError>) -> ResultView {
    match response {
        Ok(raw) => match parse_response(&raw, Page::First) {
            ParseOutcome::Structured {
                intro,
                recommendations,
                report,
            } => {
                let mut result = ResultView::new(Outcome::Success, intro.unwrap_or_default());
                result.recommendations = recommendations;
                result.validation = Some(report);
                result
            }
            ParseOutcome::Unstructured { text } => ResultView::new(Outcome::Partial, text),
        },
        Err(e) => {
            let classified = classify(&e);
            warn!("Upstream call failed: {e}");
            let mut result = ResultView::new(Outcome::Error, classified.message);
            result.error_kind = Some(classified.kind);
            result
        }
    }
}

/// Appends a load-more page. The intro is never touched.
fn apply_load_more(
    result: &mut ResultView,
    response: Result<String, UpstreamError>,
    dedup: DedupPolicy,
) {
    match response {
        Ok(raw) => match parse_response(&raw, Page::LoadMore) {
            ParseOutcome::Structured {
                recommendations, ..
            } => {
                let summary = append_page(&mut result.recommendations, recommendations, dedup);
                if summary.appended == 0 {
                    result.notice = Some(NO_NEW_ITEMS_NOTICE.to_string());
                }
            }
            ParseOutcome::Unstructured { .. } => {
                result.notice = Some(LOAD_MORE_UNSTRUCTURED_NOTICE.to_string());
            }
        },
        Err(e) => {
            warn!("Load-more call failed: {e}");
            result.notice = Some(classify(&e).message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::classifier::MODEL_UNAVAILABLE_MESSAGE;

    fn persona(section: &str) -> Persona {
        Persona {
            section_id: section.to_string(),
            title: format!("Especialista {section}"),
            role: "ajuda com recomendações".to_string(),
            greeting: "Olá!".to_string(),
            suggestions: vec![
                Suggestion {
                    text: "Praias tranquilas".to_string(),
                    description: None,
                    keywords: None,
                    is_special: false,
                },
                Suggestion {
                    text: "Explorar por categoria".to_string(),
                    description: None,
                    keywords: None,
                    is_special: true,
                },
            ],
        }
    }

    fn machine() -> ConversationMachine {
        ConversationMachine::new(persona("travel"), DedupPolicy::KeepAll)
    }

    fn coords() -> Coords {
        Coords {
            latitude: 38.72,
            longitude: -9.14,
        }
    }

    fn lisbon() -> LocationContext {
        LocationContext {
            coords: Some(coords()),
            place_name: Some("Lisboa".to_string()),
            country: Some("Portugal".to_string()),
        }
    }

    fn fetch_of(effects: &[Effect]) -> FetchRequest {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Fetch(f) => Some(f.clone()),
                _ => None,
            })
            .expect("a fetch effect")
    }

    const PAGE_ONE: &str = r#"Aqui: {"intro": "Olá", "recommendations": [
        {"category": "hotel", "name": "Hotel A", "description": "x"},
        {"category": "hotel", "name": "Hotel B", "description": "y"}
    ]}"#;

    const PAGE_TWO: &str = r#"{"recommendations": [
        {"category": "hotel", "name": "Hotel C", "description": "z"},
        {"category": "hotel", "name": "Hotel A", "description": "x"}
    ]}"#;

    fn names(m: &ConversationMachine) -> Vec<String> {
        m.state()
            .recommendations
            .iter()
            .filter_map(|r| r.name.clone())
            .collect()
    }

    fn searched(m: &mut ConversationMachine) -> FetchRequest {
        let fetch = fetch_of(&m.submit_free_text(Some("hotéis baratos em Paris")));
        assert!(m.complete(fetch.seq, Ok(PAGE_ONE.to_string())));
        fetch
    }

    #[test]
    fn test_initial_state_is_suggestions() {
        let state = machine().state();
        assert_eq!(state.view, ViewKind::Suggestions);
        assert!(state.intro_text.is_none());
        assert!(!state.location_opt_in);
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut m = machine();
        let before = m.state();
        assert!(m.submit_free_text(Some("   ")).is_empty());
        assert!(m.submit_free_text(None).is_empty());
        assert_eq!(m.state(), before);
    }

    #[test]
    fn test_submit_uses_draft_and_clears_it() {
        let mut m = machine();
        m.set_draft("museus em Madri");
        let fetch = fetch_of(&m.submit_free_text(None));
        assert_eq!(fetch.query_text, "museus em Madri");
        let state = m.state();
        assert_eq!(state.view, ViewKind::Loading);
        assert_eq!(state.current_query_text, "");
        assert_eq!(state.last_submitted_query_text, "museus em Madri");
    }

    #[test]
    fn test_success_stores_intro_and_items() {
        let mut m = machine();
        searched(&mut m);
        let state = m.state();
        assert_eq!(state.view, ViewKind::Result);
        assert_eq!(state.outcome, Some(Outcome::Success));
        assert_eq!(state.intro_text.as_deref(), Some("Olá"));
        assert_eq!(names(&m), vec!["Hotel A", "Hotel B"]);
        assert!(!state.is_loading_more);
    }

    #[test]
    fn test_unparseable_is_partial_with_raw_text() {
        let mut m = machine();
        let fetch = fetch_of(&m.submit_free_text(Some("dicas de Roma")));
        let raw = "Roma é linda na primavera.";
        assert!(m.complete(fetch.seq, Ok(raw.to_string())));
        let state = m.state();
        assert_eq!(state.outcome, Some(Outcome::Partial));
        assert_eq!(state.intro_text.as_deref(), Some(raw));
        assert!(state.recommendations.is_empty());
    }

    #[test]
    fn test_failure_is_classified_error() {
        let mut m = machine();
        let fetch = fetch_of(&m.submit_free_text(Some("dicas de Roma")));
        let err = UpstreamError::Api {
            status: 404,
            message: "not found".to_string(),
        };
        assert!(m.complete(fetch.seq, Err(err)));
        let state = m.state();
        assert_eq!(state.outcome, Some(Outcome::Error));
        assert_eq!(state.error_kind, Some(ErrorKind::ModelUnavailable));
        assert_eq!(state.intro_text.as_deref(), Some(MODEL_UNAVAILABLE_MESSAGE));
    }

    #[test]
    fn test_every_submit_ends_in_exactly_one_result() {
        let responses: Vec<Result<String, UpstreamError>> = vec![
            Ok(PAGE_ONE.to_string()),
            Ok("texto livre".to_string()),
            Err(UpstreamError::EmptyContent),
        ];
        for response in responses {
            let mut m = machine();
            let fetch = fetch_of(&m.submit_free_text(Some("qualquer coisa")));
            assert_eq!(m.state().view, ViewKind::Loading);
            assert!(m.complete(fetch.seq, response));
            assert_eq!(m.state().view, ViewKind::Result);
        }
    }

    #[test]
    fn test_load_more_appends_and_keeps_intro() {
        let mut m = machine();
        searched(&mut m);

        let fetch = fetch_of(&m.load_more());
        assert_eq!(fetch.page, Page::LoadMore);
        assert_eq!(fetch.query_text, "hotéis baratos em Paris");
        let during = m.state();
        assert!(during.is_loading_more);
        assert_eq!(during.view, ViewKind::Result);
        assert_eq!(during.recommendations.len(), 2);

        assert!(m.complete(fetch.seq, Ok(PAGE_TWO.to_string())));
        let state = m.state();
        assert!(!state.is_loading_more);
        assert_eq!(state.intro_text.as_deref(), Some("Olá"));
        // repeats are kept by default
        assert_eq!(names(&m), vec!["Hotel A", "Hotel B", "Hotel C", "Hotel A"]);
    }

    #[test]
    fn test_load_more_with_skip_policy() {
        let mut m = ConversationMachine::new(persona("travel"), DedupPolicy::SkipKnown);
        searched(&mut m);
        let fetch = fetch_of(&m.load_more());
        assert!(m.complete(fetch.seq, Ok(PAGE_TWO.to_string())));
        assert_eq!(names(&m), vec!["Hotel A", "Hotel B", "Hotel C"]);
    }

    #[test]
    fn test_load_more_gated_while_in_flight() {
        let mut m = machine();
        searched(&mut m);
        assert_eq!(m.load_more().len(), 1);
        let before = m.state();
        assert!(m.load_more().is_empty());
        assert_eq!(m.state(), before);
    }

    #[test]
    fn test_load_more_noop_without_result_or_query() {
        let mut m = machine();
        assert!(m.load_more().is_empty());
        m.submit_free_text(Some("algo"));
        assert!(m.load_more().is_empty(), "not from Loading");
    }

    #[test]
    fn test_load_more_failure_keeps_results() {
        let mut m = machine();
        searched(&mut m);
        let fetch = fetch_of(&m.load_more());
        assert!(m.complete(fetch.seq, Err(UpstreamError::EmptyContent)));
        let state = m.state();
        assert_eq!(state.outcome, Some(Outcome::Success));
        assert_eq!(state.intro_text.as_deref(), Some("Olá"));
        assert_eq!(state.recommendations.len(), 2);
        assert!(!state.is_loading_more);
        assert!(state.notice.is_some());
    }

    #[test]
    fn test_load_more_unstructured_sets_notice() {
        let mut m = machine();
        searched(&mut m);
        let fetch = fetch_of(&m.load_more());
        assert!(m.complete(fetch.seq, Ok("sem mais".to_string())));
        assert_eq!(m.state().notice.as_deref(), Some(LOAD_MORE_UNSTRUCTURED_NOTICE));
        assert_eq!(m.state().recommendations.len(), 2);
    }

    #[test]
    fn test_load_more_prompt_lists_shown_names() {
        let mut m = machine();
        searched(&mut m);
        let fetch = fetch_of(&m.load_more());
        let request = m.prompt_request(&fetch);
        assert!(request.is_load_more);
        assert_eq!(request.previous_query_text.as_deref(), Some("hotéis baratos em Paris"));
        assert_eq!(request.already_listed, vec!["Hotel A", "Hotel B"]);
    }

    #[test]
    fn test_new_search_supersedes_load_more() {
        let mut m = machine();
        searched(&mut m);
        let more = fetch_of(&m.load_more());
        let fresh = fetch_of(&m.submit_free_text(Some("voos para Roma")));
        assert!(fresh.seq > more.seq);

        // the late load-more must not touch the new search
        assert!(!m.complete(more.seq, Ok(PAGE_TWO.to_string())));
        assert_eq!(m.state().view, ViewKind::Loading);

        assert!(m.complete(fresh.seq, Ok(r#"{"intro": "Voos", "recommendations": []}"#.to_string())));
        assert_eq!(m.state().intro_text.as_deref(), Some("Voos"));
        assert!(m.state().recommendations.is_empty());
    }

    #[test]
    fn test_persona_change_while_loading_discards_response() {
        let mut m = machine();
        let fetch = fetch_of(&m.submit_free_text(Some("hotéis baratos em Paris")));
        assert!(m.set_persona(persona("wine")));

        let state = m.state();
        assert_eq!(state.view, ViewKind::Suggestions);
        assert_eq!(state.section_id, "wine");
        assert_eq!(state.last_submitted_query_text, "");

        assert!(!m.complete(fetch.seq, Ok(PAGE_ONE.to_string())));
        assert_eq!(m.state(), state);
    }

    #[test]
    fn test_same_persona_is_not_a_reset() {
        let mut m = machine();
        searched(&mut m);
        assert!(!m.set_persona(persona("travel")));
        assert_eq!(m.state().view, ViewKind::Result);
    }

    #[test]
    fn test_reset_from_result() {
        let mut m = machine();
        searched(&mut m);
        assert!(m.reset());
        let state = m.state();
        assert_eq!(state.view, ViewKind::Suggestions);
        assert!(state.intro_text.is_none());
        assert!(state.recommendations.is_empty());
        assert_eq!(state.last_submitted_query_text, "");
        assert!(m.load_more().is_empty());
    }

    #[test]
    fn test_reset_ignored_while_loading() {
        let mut m = machine();
        m.submit_free_text(Some("algo"));
        assert!(!m.reset());
        assert_eq!(m.state().view, ViewKind::Loading);
    }

    #[test]
    fn test_special_suggestion_opens_categories_and_opts_in() {
        let mut m = machine();
        m.set_location(false, Some(coords()));
        let special = m.persona().suggestions[1].clone();
        let effects = m.select_suggestion(&special);
        assert_eq!(m.state().view, ViewKind::Categories);
        assert!(m.state().location_opt_in);
        assert!(matches!(effects.as_slice(), [Effect::ResolveLocation { .. }]));
    }

    #[test]
    fn test_plain_suggestion_searches() {
        let mut m = machine();
        let plain = m.persona().suggestions[0].clone();
        let fetch = fetch_of(&m.select_suggestion(&plain));
        assert_eq!(fetch.query_text, "Praias tranquilas");
        assert_eq!(m.state().view, ViewKind::Loading);
    }

    #[test]
    fn test_category_query_includes_place_when_resolved() {
        let mut m = machine();
        let effects = m.set_location(true, Some(coords()));
        let Effect::ResolveLocation { generation, .. } = effects[0] else {
            panic!("expected resolution");
        };
        assert!(m.location_resolved(generation, Some(lisbon())));

        let category = CategoryOption {
            id: "museums".to_string(),
            label: "Museus".to_string(),
            description: "arte e história".to_string(),
            icon: "🏛️".to_string(),
        };
        let fetch = fetch_of(&m.select_category(&category));
        assert_eq!(fetch.query_text, "Museus: arte e história perto de Lisboa");
        assert_eq!(
            m.prompt_request(&fetch).location_context,
            Some(lisbon())
        );
    }

    #[test]
    fn test_locality_keyword_forces_opt_in_once() {
        let mut m = machine();
        m.set_location(false, Some(coords()));

        let effects = m.submit_free_text(Some("restaurantes perto de mim"));
        assert!(m.state().location_opt_in);
        assert!(matches!(effects[0], Effect::ResolveLocation { .. }));
        assert!(matches!(effects[1], Effect::Fetch(_)));

        // still resolving: no second lookup, the fetch waits for the first one
        let effects = m.submit_free_text(Some("bares perto de mim"));
        assert!(effects.is_empty());

        let Effect::ResolveLocation { generation, .. } = m.set_location(true, Some(coords()))[0] else {
            panic!("new coordinates re-resolve");
        };
        assert!(m.location_resolved(generation, Some(lisbon())));
        let released = m.release_deferred();
        assert!(matches!(&released, Some(Effect::Fetch(f)) if f.query_text == "bares perto de mim"));

        // resolved: no lookup at all
        let effects = m.submit_free_text(Some("cafés aqui perto"));
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Fetch(_)));
    }

    #[test]
    fn test_search_waits_for_lookup_started_earlier() {
        let mut m = machine();
        m.set_location(false, Some(coords()));
        let first = m.submit_free_text(Some("restaurantes perto de mim"));
        let Effect::ResolveLocation { generation, .. } = first[0] else {
            panic!("expected resolution");
        };

        assert!(m.submit_free_text(Some("cafés aqui perto")).is_empty());
        assert!(m.release_deferred().is_none(), "lookup still pending");

        assert!(m.location_resolved(generation, Some(lisbon())));
        let Some(Effect::Fetch(fetch)) = m.release_deferred() else {
            panic!("deferred fetch released");
        };
        assert_eq!(fetch.query_text, "cafés aqui perto");
        assert!(m.is_current(fetch.seq));
        assert_eq!(m.prompt_request(&fetch).location_context, Some(lisbon()));
        assert!(m.release_deferred().is_none());
    }

    #[test]
    fn test_opt_out_releases_waiting_fetch() {
        let mut m = machine();
        m.set_location(false, Some(coords()));
        m.submit_free_text(Some("bares perto de mim"));
        assert!(m.submit_free_text(Some("bares por aqui")).is_empty());

        let effects = m.set_location(false, None);
        assert!(matches!(effects.as_slice(), [Effect::Fetch(f)] if f.query_text == "bares por aqui"));
    }

    #[test]
    fn test_reset_drops_waiting_fetch() {
        let mut m = machine();
        m.set_location(false, Some(coords()));
        let Effect::ResolveLocation { generation, .. } = m.submit_free_text(Some("bares perto de mim"))[0] else {
            panic!("expected resolution");
        };
        m.submit_free_text(Some("cafés aqui"));
        assert!(m.set_persona(persona("wine")));
        assert!(m.location_resolved(generation, Some(lisbon())));
        assert!(m.release_deferred().is_none());
    }

    #[test]
    fn test_opt_in_without_coords_stays_empty() {
        let mut m = machine();
        let effects = m.submit_free_text(Some("o que fazer aqui"));
        assert!(m.state().location_opt_in);
        assert_eq!(effects.len(), 1);
        let fetch = fetch_of(&effects);
        assert_eq!(m.prompt_request(&fetch).location_context, Some(LocationContext::default()));
    }

    #[test]
    fn test_opt_out_discards_late_lookup() {
        let mut m = machine();
        let Effect::ResolveLocation { generation, .. } = m.set_location(true, Some(coords()))[0] else {
            panic!("expected resolution");
        };
        m.set_location(false, None);
        assert!(!m.location_resolved(generation, Some(lisbon())));
        assert!(!m.state().location_opt_in);
        assert!(!m.state().location.is_resolved());
    }

    #[test]
    fn test_failed_lookup_leaves_context_empty() {
        let mut m = machine();
        let Effect::ResolveLocation { generation, .. } = m.set_location(true, Some(coords()))[0] else {
            panic!("expected resolution");
        };
        assert!(m.location_resolved(generation, None));
        assert!(m.state().location_opt_in);
        assert!(!m.state().location.is_resolved());
    }

    #[test]
    fn test_reparse_gives_same_recommendations() {
        let mut a = machine();
        let mut b = machine();
        searched(&mut a);
        searched(&mut b);
        assert_eq!(a.state().recommendations, b.state().recommendations);
    }
}

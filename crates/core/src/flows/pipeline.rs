//! Sequences the fixed ordering phases over the category navigator.

use crate::domain::category::CategoryNode;
use crate::domain::order::OrderDraft;
use crate::errors::FlowError;
use crate::flows::labels;
use crate::flows::navigator::{CategoryNavigator, NavigationStep};
use crate::flows::states::{Message, OrderingPurpose, OrderingState, Phase};
use crate::store::CategoryStore;

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineStep {
    Show(OrderingState),
    Unrecognized(OrderingState),
    /// Back at the entry phase root.
    Exit(OrderingState),
    /// `Confirm Order` on a new-order draft; the caller submits it.
    Confirmed(OrderingState),
    /// A re-entrant edit reached confirmation.
    Completed(OrderingState),
    EndChat,
}

pub struct PhasePipeline<'a, S: ?Sized> {
    navigator: CategoryNavigator<'a, S>,
}

impl<'a, S> PhasePipeline<'a, S>
where
    S: CategoryStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { navigator: CategoryNavigator::new(store) }
    }

    pub async fn start(
        &self,
        purpose: OrderingPurpose,
        entry: Phase,
        draft: OrderDraft,
    ) -> Result<PipelineStep, FlowError> {
        let state = OrderingState { phase: entry, entry, navigator: None, draft, purpose };
        self.enter_phase(state, entry).await
    }

    pub async fn respond(
        &self,
        mut state: OrderingState,
        input: &str,
    ) -> Result<PipelineStep, FlowError> {
        if labels::matches(input, labels::END_CHAT) {
            return Ok(PipelineStep::EndChat);
        }

        if state.phase == Phase::Confirmation {
            if labels::matches(input, labels::CONFIRM_ORDER) {
                return Ok(PipelineStep::Confirmed(state));
            }
            if labels::matches(input, labels::BACK) {
                return self.enter_phase(state, Phase::Quantities).await;
            }
            return Ok(PipelineStep::Unrecognized(state));
        }

        let Some(navigator) = state.navigator.take() else {
            let phase = state.phase;
            return self.enter_phase(state, phase).await;
        };

        if labels::matches(input, labels::BACK) {
            return match self.navigator.back(navigator).await? {
                NavigationStep::Showing(next) => {
                    state.navigator = Some(next);
                    Ok(PipelineStep::Show(state))
                }
                _ if state.phase == state.entry => Ok(PipelineStep::Exit(state)),
                _ => match state.phase.previous() {
                    Some(previous) => self.enter_phase(state, previous).await,
                    None => Ok(PipelineStep::Exit(state)),
                },
            };
        }

        let step = if state.phase.is_multi_level() {
            self.navigator.select(navigator.clone(), input).await?
        } else {
            self.navigator.pick(navigator.clone(), input)
        };

        match step {
            NavigationStep::Showing(next) => {
                state.navigator = Some(next);
                Ok(PipelineStep::Show(state))
            }
            NavigationStep::Leaf { node, .. } => {
                record(&mut state.draft, state.phase, &node);
                match state.phase.next() {
                    Some(next) => self.enter_phase(state, next).await,
                    None => Ok(PipelineStep::Show(state)),
                }
            }
            NavigationStep::Exit | NavigationStep::Unrecognized => {
                state.navigator = Some(navigator);
                Ok(PipelineStep::Unrecognized(state))
            }
        }
    }

    async fn enter_phase(
        &self,
        mut state: OrderingState,
        phase: Phase,
    ) -> Result<PipelineStep, FlowError> {
        let navigator = match phase.category_root() {
            Some(root) => Some(self.navigator.enter(root).await?),
            None => None,
        };
        state.phase = phase;
        state.navigator = navigator;

        if phase == Phase::Confirmation && matches!(state.purpose, OrderingPurpose::Edit(_)) {
            return Ok(PipelineStep::Completed(state));
        }
        Ok(PipelineStep::Show(state))
    }
}

fn record(draft: &mut OrderDraft, phase: Phase, node: &CategoryNode) {
    match phase {
        Phase::Products => {
            draft.product_id = Some(node.id.clone());
            draft.product_name = Some(node.name.clone());
        }
        Phase::Specifications => draft.specification = Some(node.name.clone()),
        Phase::Sizes => draft.size = Some(node.name.clone()),
        Phase::Quantities => draft.quantity_label = Some(node.name.clone()),
        Phase::Confirmation => {}
    }
}

fn phase_noun(phase: Phase) -> &'static str {
    match phase {
        Phase::Products => "product",
        Phase::Specifications => "specification",
        Phase::Sizes => "size",
        Phase::Quantities => "quantity",
        Phase::Confirmation => "order",
    }
}

/// Prompt and quick replies for the current phase.
pub fn render(state: &OrderingState) -> (Vec<Message>, Vec<String>) {
    if state.phase == Phase::Confirmation {
        let summary = format!("Please review your order:\n{}", state.draft.summary());
        return (
            vec![Message::bot(summary)],
            labels::owned(&[labels::CONFIRM_ORDER, labels::BACK, labels::END_CHAT]),
        );
    }

    let noun = phase_noun(state.phase);
    let (prompt, mut replies) = match &state.navigator {
        Some(navigator) if !navigator.options.is_empty() => {
            let prompt = match &navigator.parent {
                Some(parent) => format!("Please choose from {}:", parent.name),
                None => format!("Please choose a {noun}:"),
            };
            (prompt, navigator.options.iter().map(|node| node.name.clone()).collect())
        }
        _ => (format!("Sorry, no {noun} options are available right now."), Vec::new()),
    };
    replies.push(labels::BACK.to_owned());
    replies.push(labels::END_CHAT.to_owned());
    (vec![Message::bot(prompt)], replies)
}

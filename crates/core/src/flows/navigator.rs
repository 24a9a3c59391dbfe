//! Walks one externally supplied category tree with push/pop back-navigation.

use crate::domain::category::{CategoryNode, CategoryRoot};
use crate::errors::FlowError;
use crate::flows::states::NavigatorState;
use crate::store::CategoryStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationStep {
    Showing(NavigatorState),
    /// The chosen node has no children.
    Leaf { state: NavigatorState, node: CategoryNode },
    /// Back was pressed at the tree root.
    Exit,
    Unrecognized,
}

pub struct CategoryNavigator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CategoryNavigator<'a, S>
where
    S: CategoryStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Loads the top level of `root`. Options are never reused across entries.
    pub async fn enter(&self, root: CategoryRoot) -> Result<NavigatorState, FlowError> {
        let options = self.children(root, None).await?;
        Ok(NavigatorState { root, parent: None, stack: Vec::new(), options })
    }

    /// Multi-level selection: descends into nodes that have children.
    pub async fn select(
        &self,
        mut state: NavigatorState,
        input: &str,
    ) -> Result<NavigationStep, FlowError> {
        let Some(chosen) = find(&state, input) else {
            return Ok(NavigationStep::Unrecognized);
        };

        let children = self.children(state.root, Some(&chosen)).await?;
        if children.is_empty() {
            return Ok(NavigationStep::Leaf { state, node: chosen });
        }

        let previous = state.parent.replace(chosen);
        state.stack.push(previous);
        state.options = children;
        Ok(NavigationStep::Showing(state))
    }

    /// Single-level selection: any listed option completes the choice.
    pub fn pick(&self, state: NavigatorState, input: &str) -> NavigationStep {
        match find(&state, input) {
            Some(node) => NavigationStep::Leaf { state, node },
            None => NavigationStep::Unrecognized,
        }
    }

    pub async fn back(&self, mut state: NavigatorState) -> Result<NavigationStep, FlowError> {
        match state.stack.pop() {
            Some(parent) => {
                state.options = self.children(state.root, parent.as_ref()).await?;
                state.parent = parent;
                Ok(NavigationStep::Showing(state))
            }
            None if state.parent.is_none() => Ok(NavigationStep::Exit),
            None => Ok(NavigationStep::Showing(self.enter(state.root).await?)),
        }
    }

    async fn children(
        &self,
        root: CategoryRoot,
        parent: Option<&CategoryNode>,
    ) -> Result<Vec<CategoryNode>, FlowError> {
        self.store
            .child_categories(root, parent.map(|node| &node.id))
            .await
            .map_err(FlowError::read)
    }
}

fn find(state: &NavigatorState, input: &str) -> Option<CategoryNode> {
    state.options.iter().find(|node| node.matches_label(input)).cloned()
}

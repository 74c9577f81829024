//! Decides whether the linear echo model can be trusted.

use crate::common::seconds_to_blocks;

/// Consecutive diverged blocks after which the convergence history is
/// forfeited.
const DIVERGENCE_RUN_FORFEIT: usize = 10;
/// Consecutive diverged blocks that veto the linear model.
const DIVERGENCE_RUN_VETO: usize = 4;
/// How long a converged filter stays trusted.
const CONVERGENCE_TRUST_BLOCKS: usize = seconds_to_blocks(30);

/// Fuses saturation, render activity and filter convergence into the
/// linear model decision.
///
/// The model is selected while the echo is unsaturated, a filter has
/// converged within the last 30 seconds and the filters are not in a
/// divergence run.
#[derive(Debug)]
pub struct EchoModelSelector {
    blocks_with_proper_filter_adaptation: usize,
    blocks_since_converged_filter: usize,
    diverged_blocks: usize,
    linear_model_selected: bool,
}

impl Default for EchoModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoModelSelector {
    pub fn new() -> Self {
        Self {
            blocks_with_proper_filter_adaptation: 0,
            blocks_since_converged_filter: usize::MAX,
            diverged_blocks: 0,
            linear_model_selected: false,
        }
    }

    pub fn update(
        &mut self,
        echo_saturation: bool,
        active_render: bool,
        converged_filter: bool,
        diverged_filter: bool,
    ) {
        if active_render && !echo_saturation {
            self.blocks_with_proper_filter_adaptation += 1;
        }

        self.diverged_blocks = if diverged_filter {
            self.diverged_blocks + 1
        } else {
            0
        };

        self.blocks_since_converged_filter = if self.diverged_blocks > DIVERGENCE_RUN_FORFEIT {
            usize::MAX
        } else if converged_filter {
            0
        } else {
            self.blocks_since_converged_filter.saturating_add(1)
        };

        let recently_converged_filter = self.blocks_since_converged_filter < CONVERGENCE_TRUST_BLOCKS;
        let selected =
            !echo_saturation && recently_converged_filter && self.diverged_blocks < DIVERGENCE_RUN_VETO;

        if selected != self.linear_model_selected {
            tracing::debug!(
                selected,
                echo_saturation,
                diverged_blocks = self.diverged_blocks,
                "linear echo model selection changed"
            );
        }
        self.linear_model_selected = selected;
    }

    pub fn linear_model_selected(&self) -> bool {
        self.linear_model_selected
    }

    /// Active, unsaturated render blocks seen since the last reset.
    pub fn blocks_with_proper_filter_adaptation(&self) -> usize {
        self.blocks_with_proper_filter_adaptation
    }

    pub fn reset(&mut self) {
        self.blocks_with_proper_filter_adaptation = 0;
        self.blocks_since_converged_filter = usize::MAX;
        self.diverged_blocks = 0;
        self.linear_model_selected = false;
    }
}

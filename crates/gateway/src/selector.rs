//! Parametrized selection state machine.
//!
//! Channel-instance disambiguation and dataset disambiguation follow the
//! same protocol, so both are instances of this one component: zero
//! candidates stops the flow, one auto-selects, several consult the saved
//! choice and otherwise run a numbered menu. Menu indices shown to users
//! are 1-based and only valid against the candidate list rendered in the
//! same turn.

/// Outcome of one resolution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No candidates at all; the caller decides what that means.
    None,
    /// Proceed with candidate `i` without ending the turn.
    Selected(usize),
    /// The user picked candidate `i` this turn: persist it, confirm, and
    /// end the turn. Selection and query happen on separate turns.
    Chosen(usize),
    /// Render the numbered menu and end the turn.
    Menu,
}

/// Resolve one selection level.
///
/// `saved` is the index of a previously persisted choice, already
/// validated against the current candidate list by the caller.
/// `reserved` keywords force re-entry into the menu, but only when there
/// is actually something to choose between.
#[must_use]
pub fn resolve(
    candidates: usize,
    saved: Option<usize>,
    text: &str,
    reserved: &[&str],
) -> Resolution {
    if candidates == 0 {
        return Resolution::None;
    }
    if candidates == 1 {
        return Resolution::Selected(0);
    }

    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    if reserved.iter().any(|k| *k == lowered) {
        return Resolution::Menu;
    }

    if let Some(i) = saved {
        if i < candidates {
            return Resolution::Selected(i);
        }
    }

    if let Ok(k) = trimmed.parse::<usize>() {
        if (1..=candidates).contains(&k) {
            return Resolution::Chosen(k - 1);
        }
    }

    Resolution::Menu
}

/// Render a numbered menu over `labels`.
#[must_use]
pub fn render_menu(header: &str, labels: &[String], footer: &str) -> String {
    let mut menu = String::with_capacity(header.len() + labels.len() * 24 + footer.len());
    menu.push_str(header);
    menu.push('\n');
    for (i, label) in labels.iter().enumerate() {
        menu.push_str(&format!("\n{}. {label}", i + 1));
    }
    if !footer.is_empty() {
        menu.push_str("\n\n");
        menu.push_str(footer);
    }
    menu
}

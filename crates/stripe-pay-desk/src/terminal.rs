//! Terminal form host
//!
//! Renders alerts and dialogs as lines on stdout. Windows are not opened;
//! their URLs are printed for the user to follow. Reload requests are queued
//! so the caller can re-fetch the document once the click has finished.

use std::sync::Mutex;

use stripe_pay_core::{FormHost, Indicator};

/// Line printed for an alert
pub fn format_alert(message: &str, indicator: Indicator, color: bool) -> String {
    if !color {
        return format!("[{}] {message}", indicator.as_str());
    }

    let code = match indicator {
        Indicator::Blue => 34,
        Indicator::Green => 32,
        Indicator::Orange => 33,
        Indicator::Red => 31,
    };
    format!("\x1b[{code}m●\x1b[0m {message}")
}

#[derive(Default)]
pub struct TerminalHost {
    color: bool,
    reloads: Mutex<Vec<(String, String)>>,
}

impl TerminalHost {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            reloads: Mutex::new(Vec::new()),
        }
    }

    /// Drain queued `(doctype, name)` reload requests
    pub fn take_reloads(&self) -> Vec<(String, String)> {
        self.reloads
            .lock()
            .map(|mut reloads| std::mem::take(&mut *reloads))
            .unwrap_or_default()
    }
}

impl FormHost for TerminalHost {
    fn show_alert(&self, message: &str, indicator: Indicator) {
        println!("{}", format_alert(message, indicator, self.color));
    }

    fn msgprint(&self, message: &str) {
        println!();
        println!("  {message}");
        println!();
    }

    fn open_window(&self, url: &str) {
        println!("Open: {url}");
    }

    fn reload_doc(&self, doctype: &str, name: &str) {
        tracing::debug!(doctype = %doctype, name = %name, "Reload requested");
        if let Ok(mut reloads) = self.reloads.lock() {
            reloads.push((doctype.to_string(), name.to_string()));
        }
    }
}

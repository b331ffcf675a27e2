//! Form host seam
//!
//! Everything the user sees goes through [`FormHost`]: alerts, message
//! dialogs, new windows and document reloads.

/// Alert colour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indicator {
    Blue,
    Green,
    Orange,
    Red,
}

impl Indicator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }

    /// Red alerts report something the user asked for that did not happen
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Red)
    }
}

/// UI surface of the desk framework
pub trait FormHost: Send + Sync {
    /// Transient, non-blocking alert
    fn show_alert(&self, message: &str, indicator: Indicator);

    /// Message dialog
    fn msgprint(&self, message: &str);

    /// Open `url` in a new navigation context
    fn open_window(&self, url: &str);

    /// Re-fetch the open document from the server and redraw it
    fn reload_doc(&self, doctype: &str, name: &str);
}

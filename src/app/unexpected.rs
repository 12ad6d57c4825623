//! Catch-all for panics escaping boot or the control loop. The panic hook
//! records where it happened; [`escalate`] turns it into fault 1000.

use std::{
    any::Any,
    panic,
    path::Path,
    sync::{Mutex, PoisonError},
};

use crate::app::Logger;
use crate::guard::{wrap_lines, Fault, FaultKind};
use crate::session::Session;
use crate::DISPLAY_COLS;

const MAX_MESSAGE_CHARS: usize = 84;

/// Where and why the last panic happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    pub file: String,
    pub line: u32,
    pub message: String,
}

static LAST_PANIC: Mutex<Option<PanicReport>> = Mutex::new(None);

/// Record panic locations for the catch-all and log them.
pub fn install_hook(logger: Logger) {
    panic::set_hook(Box::new(move |info| {
        let (file, line) = info
            .location()
            .map(|loc| (loc.file().to_string(), loc.line()))
            .unwrap_or_else(|| ("<unknown>".to_string(), 0));
        let message = payload_message(info.payload());
        logger.error(format!("panic at {file}:{line}: {message}"));
        let report = PanicReport {
            file,
            line,
            message,
        };
        *LAST_PANIC.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
    }));
}

pub fn take_report() -> Option<PanicReport> {
    LAST_PANIC
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Screen lines for fault 1000.
pub fn fault_lines(report: &PanicReport) -> Vec<String> {
    let mut chars = report.message.chars();
    let mut text: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    if let Some((cut, _)) = text.char_indices().nth(MAX_MESSAGE_CHARS) {
        text.truncate(cut);
    }

    let file_name = Path::new(&report.file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.file.clone());

    let mut lines = vec!["An unexpected error occured:".to_string()];
    if !text.is_empty() {
        lines.extend(wrap_lines(&text, DISPLAY_COLS));
    }
    lines.push(format!("In {file_name}, line {}", report.line));
    lines.push("Please attempt to reproduce this error".to_string());
    lines.push("and report it on the GitHub page!".to_string());
    lines
}

/// Draw the waiting screen, re-open storage through the guard and report
/// the panic as a user-recoverable fault.
pub fn escalate(session: &mut Session, payload: Box<dyn Any + Send>) -> ! {
    let report = take_report().unwrap_or_else(|| PanicReport {
        file: "<unknown>".to_string(),
        line: 0,
        message: payload_message(payload.as_ref()),
    });
    session.presenter().draw_waiting_screen();
    let reopened = session.storage().open();
    session.check(reopened);
    session.escalate(Fault::new(FaultKind::Unexpected, fault_lines(&report)))
}

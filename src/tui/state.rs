use crate::model::{LaunchParams, DATABASES_MAX, DATABASES_MIN};
use ratatui::{
    style::Color,
    style::Style,
    text::Line,
};

pub const TAB_CONFIG: usize = 0;
pub const TAB_TERMINAL: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

pub const FIELD_HOST: usize = 0;
pub const FIELD_PORT: usize = 1;
pub const FIELD_TIMEOUT: usize = 2;
pub const FIELD_DATABASES: usize = 3;
pub const FIELD_DBFILENAME: usize = 4;
pub const FIELD_COUNT: usize = 5;

/// Editable launch-parameter form. Text fields are free-form; the database
/// count is a spin field bounded 1-99.
pub struct FormState {
    pub host: String,
    pub port: String,
    pub timeout: String,
    pub databases: u32,
    pub dbfilename: String,
    pub selected: usize,
}

impl FormState {
    pub fn from_params(params: &LaunchParams) -> Self {
        Self {
            host: params.host.clone(),
            port: params.port.clone(),
            timeout: params.timeout.clone(),
            databases: params.databases,
            dbfilename: params.dbfilename.clone(),
            selected: FIELD_HOST,
        }
    }

    pub fn params(&self) -> LaunchParams {
        LaunchParams {
            host: self.host.clone(),
            port: self.port.clone(),
            timeout: self.timeout.clone(),
            databases: self.databases,
            dbfilename: self.dbfilename.clone(),
        }
        .normalized()
    }

    pub fn load(&mut self, params: &LaunchParams) {
        self.host = params.host.clone();
        self.port = params.port.clone();
        self.timeout = params.timeout.clone();
        self.databases = params.databases;
        self.dbfilename = params.dbfilename.clone();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + FIELD_COUNT - 1) % FIELD_COUNT;
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % FIELD_COUNT;
    }

    pub fn spin_databases(&mut self, delta: i64) {
        let next = i64::from(self.databases).saturating_add(delta);
        self.databases = next.clamp(i64::from(DATABASES_MIN), i64::from(DATABASES_MAX)) as u32;
    }

    pub fn push_char(&mut self, c: char) {
        if self.selected == FIELD_DATABASES {
            // Spin field: digits adjust via left/right, not typed text.
            return;
        }
        if let Some(field) = self.text_field_mut() {
            field.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.text_field_mut() {
            field.pop();
        }
    }

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.selected {
            FIELD_HOST => Some(&mut self.host),
            FIELD_PORT => Some(&mut self.port),
            FIELD_TIMEOUT => Some(&mut self.timeout),
            FIELD_DBFILENAME => Some(&mut self.dbfilename),
            _ => None,
        }
    }
}

pub struct UiState {
    pub tab: usize,
    pub form: FormState,
    pub running_pid: Option<u32>,
    pub info: String,
    pub scrollback: Vec<Line<'static>>,
    /// Lines above the bottom of the scrollback; 0 follows new output.
    pub scroll_offset: usize,
    partial: String,
}

impl UiState {
    pub fn new(params: &LaunchParams) -> Self {
        Self {
            tab: TAB_CONFIG,
            form: FormState::from_params(params),
            running_pid: None,
            info: String::new(),
            scrollback: Vec::new(),
            scroll_offset: 0,
            partial: String::new(),
        }
    }

    pub fn push_line(&mut self, line: Line<'static>) {
        const MAX: usize = 2_000;
        self.scrollback.push(line);
        if self.scrollback.len() > MAX {
            let _ = self.scrollback.drain(0..(self.scrollback.len() - MAX));
        }
    }

    pub fn push_colored(&mut self, text: String, color: Color) {
        self.push_line(Line::styled(text, Style::default().fg(color)));
    }

    /// Feed raw child output into the scrollback.
    ///
    /// CSI escape sequences are dropped (the pane renders plain text), CR is
    /// ignored, and an unterminated trailing line is carried to the next chunk.
    pub fn feed_output(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => {
                    if chars.peek() == Some(&'[') {
                        chars.next();
                        for c2 in chars.by_ref() {
                            if ('\x40'..='\x7e').contains(&c2) {
                                break;
                            }
                        }
                    }
                }
                '\n' => {
                    let line = std::mem::take(&mut self.partial);
                    self.push_line(Line::raw(line));
                }
                '\r' => {}
                c if c.is_control() => {}
                c => self.partial.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_round_trips_params() {
        let params = LaunchParams::default();
        let form = FormState::from_params(&params);
        assert_eq!(form.params(), params);
    }

    #[test]
    fn databases_spin_clamps_to_range() {
        let mut form = FormState::from_params(&LaunchParams::default());
        form.selected = FIELD_DATABASES;
        form.spin_databases(1_000);
        assert_eq!(form.databases, DATABASES_MAX);
        form.spin_databases(-1_000);
        assert_eq!(form.databases, DATABASES_MIN);
    }

    #[test]
    fn typing_is_ignored_on_the_spin_field() {
        let mut form = FormState::from_params(&LaunchParams::default());
        form.selected = FIELD_DATABASES;
        form.push_char('7');
        assert_eq!(form.databases, 16);
    }

    #[test]
    fn output_feed_splits_lines_and_strips_csi() {
        let mut state = UiState::new(&LaunchParams::default());
        state.feed_output(b"\x1b[32mready\x1b[0m to accept\r\nconnections");
        assert_eq!(state.scrollback.len(), 1);
        assert_eq!(state.scrollback[0].to_string(), "ready to accept");

        // The trailing partial line lands once terminated.
        state.feed_output(b" on port 6379\n");
        assert_eq!(state.scrollback.len(), 2);
        assert_eq!(state.scrollback[1].to_string(), "connections on port 6379");
    }
}

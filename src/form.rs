/// How a form field takes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Rendered masked.
    Secret,
    /// Cycles through fixed values with Left/Right.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
    // in chars, not bytes
    cursor: usize,
}

impl FormField {
    pub fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self::new(label, FieldKind::Text, value.into())
    }

    pub fn secret(label: &'static str) -> Self {
        Self::new(label, FieldKind::Secret, String::new())
    }

    pub fn choice(label: &'static str, choices: &'static [&'static str], value: &str) -> Self {
        let value = if choices.contains(&value) {
            value.to_string()
        } else {
            choices.first().map(|c| c.to_string()).unwrap_or_default()
        };
        Self::new(label, FieldKind::Choice(choices), value)
    }

    fn new(label: &'static str, kind: FieldKind, value: String) -> Self {
        let cursor = value.chars().count();
        FormField {
            label,
            kind,
            value,
            cursor,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn display_value(&self) -> String {
        match self.kind {
            FieldKind::Secret => "*".repeat(self.value.chars().count()),
            FieldKind::Choice(_) => format!("< {} >", self.value),
            FieldKind::Text => self.value.clone(),
        }
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn cycle(&mut self, forward: bool) {
        if let FieldKind::Choice(choices) = self.kind {
            if choices.is_empty() {
                return;
            }
            let current = choices.iter().position(|c| *c == self.value).unwrap_or(0);
            let next = if forward {
                (current + 1) % choices.len()
            } else {
                (current + choices.len() - 1) % choices.len()
            };
            self.value = choices[next].to_string();
        }
    }
}

/// A small modal form: a stack of single-line fields, one focused.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub title: String,
    pub fields: Vec<FormField>,
    pub focused: usize,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Form {
            title: title.into(),
            fields,
            focused: 0,
        }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    fn current(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focused)
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
        }
    }

    pub fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(field) = self.current() {
            if matches!(field.kind, FieldKind::Choice(_)) {
                if c == ' ' {
                    field.cycle(true);
                }
                return;
            }
            let at = field.byte_index();
            field.value.insert(at, c);
            field.cursor += 1;
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(field) = self.current() {
            if matches!(field.kind, FieldKind::Choice(_)) || field.cursor == 0 {
                return;
            }
            field.cursor -= 1;
            let at = field.byte_index();
            field.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if let Some(field) = self.current() {
            match field.kind {
                FieldKind::Choice(_) => field.cycle(false),
                _ => field.cursor = field.cursor.saturating_sub(1),
            }
        }
    }

    pub fn move_cursor_right(&mut self) {
        if let Some(field) = self.current() {
            match field.kind {
                FieldKind::Choice(_) => field.cycle(true),
                _ => field.cursor = (field.cursor + 1).min(field.value.chars().count()),
            }
        }
    }

    pub fn move_to_start_of_line(&mut self) {
        if let Some(field) = self.current() {
            field.cursor = 0;
        }
    }

    pub fn move_to_end_of_line(&mut self) {
        if let Some(field) = self.current() {
            field.cursor = field.value.chars().count();
        }
    }
}

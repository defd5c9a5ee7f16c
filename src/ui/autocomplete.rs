/// Text input that offers matching entries from a fixed list of choices.
/// Matching is a case-insensitive substring test, so typing a family name or
/// an id both narrow the list. An empty input offers every choice.
#[derive(Default, Clone, Debug)]
pub(crate) struct AutocompleteField {
    pub(crate) text: String,
    pub(crate) suggestions: Vec<String>,
    pub(crate) highlighted: usize,
    /// Set by Esc; suggestions stay hidden until the text changes again.
    dismissed: bool,
}

impl AutocompleteField {
    pub(crate) fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.text.push(ch);
        self.dismissed = false;
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.text.pop();
        self.dismissed = false;
    }

    /// Recompute the suggestion list against `choices`.
    pub(crate) fn refresh(&mut self, choices: &[String]) {
        if self.dismissed {
            self.suggestions.clear();
            self.highlighted = 0;
            return;
        }

        let needle = self.text.trim().to_lowercase();
        self.suggestions = choices
            .iter()
            .filter(|choice| needle.is_empty() || choice.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        // Nothing left to offer once the text is exactly a choice.
        if self.suggestions.len() == 1 && self.suggestions[0] == self.text {
            self.suggestions.clear();
        }

        if self.highlighted >= self.suggestions.len() {
            self.highlighted = 0;
        }
    }

    pub(crate) fn clear_suggestions(&mut self) {
        self.suggestions.clear();
        self.highlighted = 0;
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub(crate) fn move_highlight(&mut self, delta: isize) {
        if self.suggestions.is_empty() {
            return;
        }
        let last = self.suggestions.len() as isize - 1;
        self.highlighted = (self.highlighted as isize + delta).clamp(0, last) as usize;
    }

    /// Replace the text with the highlighted suggestion. The list stays shut
    /// until the text is edited, even if the choice is part of longer labels.
    pub(crate) fn accept(&mut self) -> bool {
        match self.suggestions.get(self.highlighted).cloned() {
            Some(choice) => {
                self.text = choice;
                self.dismissed = true;
                self.clear_suggestions();
                true
            }
            None => false,
        }
    }

    /// Hide suggestions until the next edit. Returns whether anything was
    /// open.
    pub(crate) fn dismiss(&mut self) -> bool {
        let was_open = self.is_open();
        self.dismissed = true;
        self.clear_suggestions();
        was_open
    }

    /// The id in front of the first `-` of a `"{id}-..."` choice.
    pub(crate) fn selected_id(&self) -> Option<i64> {
        self.text.split('-').next()?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<String> {
        vec![
            "1-Ada Lovelace".to_string(),
            "2-Alan Turing".to_string(),
            "3-Grace Hopper".to_string(),
        ]
    }

    #[test]
    fn empty_text_offers_everything() {
        let mut field = AutocompleteField::default();
        field.refresh(&choices());
        assert_eq!(field.suggestions.len(), 3);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let mut field = AutocompleteField::default();
        for ch in "TUR".chars() {
            field.push_char(ch);
        }
        field.refresh(&choices());
        assert_eq!(field.suggestions, vec!["2-Alan Turing".to_string()]);
    }

    #[test]
    fn accept_takes_the_highlighted_entry() {
        let mut field = AutocompleteField::with_text("a");
        field.refresh(&choices());
        field.move_highlight(1);
        field.move_highlight(10);
        assert!(field.accept());
        assert_eq!(field.text, "3-Grace Hopper");
        assert!(!field.is_open());
        assert_eq!(field.selected_id(), Some(3));
    }

    #[test]
    fn accepted_prefix_of_longer_labels_stays_closed() {
        let choices = vec![
            "1-Dune by Frank Herbert".to_string(),
            "11-Dune by Frank Herbert".to_string(),
        ];
        let mut field = AutocompleteField::default();
        field.refresh(&choices);
        assert!(field.accept());
        field.refresh(&choices);
        assert!(!field.is_open());
        assert_eq!(field.selected_id(), Some(1));

        field.backspace();
        field.refresh(&choices);
        assert!(field.is_open());
    }

    #[test]
    fn exact_match_closes_the_list() {
        let mut field = AutocompleteField::with_text("1-Ada Lovelace");
        field.refresh(&choices());
        assert!(!field.is_open());
    }

    #[test]
    fn dismiss_holds_until_the_next_edit() {
        let mut field = AutocompleteField::with_text("a");
        field.refresh(&choices());
        assert!(field.dismiss());
        field.refresh(&choices());
        assert!(!field.is_open());

        field.push_char('d');
        field.refresh(&choices());
        assert_eq!(field.suggestions, vec!["1-Ada Lovelace".to_string()]);
    }

    #[test]
    fn selected_id_needs_a_numeric_prefix() {
        assert_eq!(AutocompleteField::with_text("12-Dune by X").selected_id(), Some(12));
        assert_eq!(AutocompleteField::with_text("Dune").selected_id(), None);
        assert_eq!(AutocompleteField::default().selected_id(), None);
    }
}

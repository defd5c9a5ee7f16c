use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use ratatui::text::Line;

use crate::models::{Book, Borrow, Member};
use crate::validators::date_validator;

use super::autocomplete::AutocompleteField;
use super::helpers::field_line;

/// Internal representation of the book form. `id` is set when the form was
/// opened from an existing row, which turns Enter into an edit.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) id: Option<i64>,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) pages: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Fields available within the book form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum BookField {
    #[default]
    Title,
    Author,
    Pages,
}

impl BookForm {
    /// Populate the form from an existing book when editing.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            id: Some(book.id),
            title: book.title.clone(),
            author: book.author.clone(),
            pages: book.pages.to_string(),
            active: BookField::Title,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Author,
            BookField::Author => BookField::Pages,
            BookField::Pages => BookField::Title,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Pages,
            BookField::Author => BookField::Title,
            BookField::Pages => BookField::Author,
        };
    }

    /// Append a character to the active field. The page count only takes
    /// digits.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            BookField::Pages if !ch.is_ascii_digit() => false,
            _ if ch.is_control() => false,
            BookField::Title => {
                self.title.push(ch);
                true
            }
            BookField::Author => {
                self.author.push(ch);
                true
            }
            BookField::Pages => {
                self.pages.push(ch);
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            BookField::Title => self.title.pop(),
            BookField::Author => self.author.pop(),
            BookField::Pages => self.pages.pop(),
        };
    }

    /// Check the inputs are present and typed; the model validators decide the
    /// rest.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, i64)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Title is required!"));
        }
        let author = self.author.trim();
        if author.is_empty() {
            return Err(anyhow!("Author is required!"));
        }
        let pages_raw = self.pages.trim();
        if pages_raw.is_empty() {
            return Err(anyhow!("Pages is required!"));
        }
        let pages = pages_raw
            .parse::<i64>()
            .map_err(|_| anyhow!("Pages must be an integer!"))?;
        if pages <= 0 {
            return Err(anyhow!("Pages must be greater than 0!"));
        }
        Ok((title.to_string(), author.to_string(), pages))
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            field_line("Title", &self.title, "<required>", self.active == BookField::Title),
            field_line("Author", &self.author, "<required>", self.active == BookField::Author),
            field_line("Pages", &self.pages, "<required>", self.active == BookField::Pages),
        ]
    }

    /// Row offset and cursor column of the active field.
    pub(crate) fn cursor(&self) -> (u16, usize) {
        match self.active {
            BookField::Title => (0, "Title: ".len() + self.title.chars().count()),
            BookField::Author => (1, "Author: ".len() + self.author.chars().count()),
            BookField::Pages => (2, "Pages: ".len() + self.pages.chars().count()),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemberForm {
    pub(crate) id: Option<i64>,
    pub(crate) name: String,
    pub(crate) family: String,
    pub(crate) active: MemberField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum MemberField {
    #[default]
    Name,
    Family,
}

impl MemberForm {
    pub(crate) fn from_member(member: &Member) -> Self {
        Self {
            id: Some(member.id),
            name: member.name.clone(),
            family: member.family.clone(),
            active: MemberField::Name,
            error: None,
        }
    }

    /// Swap focus between the two name fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            MemberField::Name => MemberField::Family,
            MemberField::Family => MemberField::Name,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            MemberField::Name => self.name.push(ch),
            MemberField::Family => self.family.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            MemberField::Name => self.name.pop(),
            MemberField::Family => self.family.pop(),
        };
    }

    pub(crate) fn parse_inputs(&self) -> Result<(String, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Name is required!"));
        }
        let family = self.family.trim();
        if family.is_empty() {
            return Err(anyhow!("Family is required!"));
        }
        Ok((name.to_string(), family.to_string()))
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            field_line("Name", &self.name, "<required>", self.active == MemberField::Name),
            field_line("Family", &self.family, "<required>", self.active == MemberField::Family),
        ]
    }

    pub(crate) fn cursor(&self) -> (u16, usize) {
        match self.active {
            MemberField::Name => (0, "Name: ".len() + self.name.chars().count()),
            MemberField::Family => (1, "Family: ".len() + self.family.chars().count()),
        }
    }
}

/// Borrow form. Member and book are picked through autocomplete over the
/// `"{id}-..."` labels; the id prefix is what gets saved.
#[derive(Default, Clone)]
pub(crate) struct BorrowForm {
    pub(crate) id: Option<i64>,
    pub(crate) member: AutocompleteField,
    pub(crate) book: AutocompleteField,
    pub(crate) borrow_date: String,
    pub(crate) return_date: String,
    pub(crate) active: BorrowField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum BorrowField {
    #[default]
    Member,
    Book,
    BorrowDate,
    ReturnDate,
}

/// Values a borrow form produces once it parses.
#[derive(Debug)]
pub(crate) struct BorrowInputs {
    pub(crate) member_id: i64,
    pub(crate) book_id: i64,
    pub(crate) borrow_date: NaiveDate,
    pub(crate) return_date: Option<NaiveDate>,
}

impl BorrowForm {
    /// Load an existing borrow. Member and book are shown with their labels
    /// when they are still in the lists, else just by id.
    pub(crate) fn from_borrow(borrow: &Borrow, members: &[Member], books: &[Book]) -> Self {
        let member = members
            .iter()
            .find(|m| m.id == borrow.member_id)
            .map(Member::choice_label)
            .unwrap_or_else(|| borrow.member_id.to_string());
        let book = books
            .iter()
            .find(|b| b.id == borrow.book_id)
            .map(Book::choice_label)
            .unwrap_or_else(|| borrow.book_id.to_string());

        Self {
            id: Some(borrow.id),
            member: AutocompleteField::with_text(member),
            book: AutocompleteField::with_text(book),
            borrow_date: borrow.borrow_date.to_string(),
            return_date: borrow.return_date.map(|d| d.to_string()).unwrap_or_default(),
            active: BorrowField::Member,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            BorrowField::Member => BorrowField::Book,
            BorrowField::Book => BorrowField::BorrowDate,
            BorrowField::BorrowDate => BorrowField::ReturnDate,
            BorrowField::ReturnDate => BorrowField::Member,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            BorrowField::Member => BorrowField::ReturnDate,
            BorrowField::Book => BorrowField::Member,
            BorrowField::BorrowDate => BorrowField::Book,
            BorrowField::ReturnDate => BorrowField::BorrowDate,
        };
    }

    /// The autocomplete behind the focused field, if it has one.
    pub(crate) fn active_autocomplete(&mut self) -> Option<&mut AutocompleteField> {
        match self.active {
            BorrowField::Member => Some(&mut self.member),
            BorrowField::Book => Some(&mut self.book),
            _ => None,
        }
    }

    /// Date fields take digits and `-` only.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            BorrowField::Member => self.member.push_char(ch),
            BorrowField::Book => self.book.push_char(ch),
            BorrowField::BorrowDate | BorrowField::ReturnDate
                if !(ch.is_ascii_digit() || ch == '-') =>
            {
                false
            }
            BorrowField::BorrowDate => {
                self.borrow_date.push(ch);
                true
            }
            BorrowField::ReturnDate => {
                self.return_date.push(ch);
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            BorrowField::Member => self.member.backspace(),
            BorrowField::Book => self.book.backspace(),
            BorrowField::BorrowDate => {
                self.borrow_date.pop();
            }
            BorrowField::ReturnDate => {
                self.return_date.pop();
            }
        }
    }

    /// Only the focused picker shows suggestions.
    pub(crate) fn refresh_suggestions(&mut self, members: &[String], books: &[String]) {
        match self.active {
            BorrowField::Member => {
                self.member.refresh(members);
                self.book.clear_suggestions();
            }
            BorrowField::Book => {
                self.book.refresh(books);
                self.member.clear_suggestions();
            }
            _ => {
                self.member.clear_suggestions();
                self.book.clear_suggestions();
            }
        }
    }

    /// An empty borrow date means `today`; an empty return date means the book
    /// is still out.
    pub(crate) fn parse_inputs(&self, today: NaiveDate) -> Result<BorrowInputs> {
        if self.member.text.trim().is_empty() {
            return Err(anyhow!("Please select a member."));
        }
        let member_id = self
            .member
            .selected_id()
            .filter(|id| *id > 0)
            .ok_or_else(|| anyhow!("Member ID not valid!"))?;

        if self.book.text.trim().is_empty() {
            return Err(anyhow!("Please select a book."));
        }
        let book_id = self
            .book
            .selected_id()
            .filter(|id| *id > 0)
            .ok_or_else(|| anyhow!("Book ID not valid!"))?;

        let borrow_date = if self.borrow_date.trim().is_empty() {
            today
        } else {
            date_validator(&self.borrow_date, "Invalid borrow date!")?
        };
        let return_date = if self.return_date.trim().is_empty() {
            None
        } else {
            Some(date_validator(&self.return_date, "Invalid return date!")?)
        };

        Ok(BorrowInputs {
            member_id,
            book_id,
            borrow_date,
            return_date,
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            field_line(
                "Member",
                &self.member.text,
                "<type to search>",
                self.active == BorrowField::Member,
            ),
            field_line(
                "Book",
                &self.book.text,
                "<type to search>",
                self.active == BorrowField::Book,
            ),
            field_line(
                "Borrow Date",
                &self.borrow_date,
                "<today>",
                self.active == BorrowField::BorrowDate,
            ),
            field_line(
                "Return Date",
                &self.return_date,
                "<not returned>",
                self.active == BorrowField::ReturnDate,
            ),
        ]
    }

    pub(crate) fn cursor(&self) -> (u16, usize) {
        match self.active {
            BorrowField::Member => (0, "Member: ".len() + self.member.text.chars().count()),
            BorrowField::Book => (1, "Book: ".len() + self.book.text.chars().count()),
            BorrowField::BorrowDate => (
                2,
                "Borrow Date: ".len() + self.borrow_date.chars().count(),
            ),
            BorrowField::ReturnDate => (
                3,
                "Return Date: ".len() + self.return_date.chars().count(),
            ),
        }
    }
}

/// Which table a pending delete targets.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum RecordKind {
    Member,
    Book,
    Borrow,
}

impl RecordKind {
    pub(crate) fn noun(self) -> &'static str {
        match self {
            RecordKind::Member => "member",
            RecordKind::Book => "book",
            RecordKind::Borrow => "borrow",
        }
    }
}

/// State for confirming a delete.
#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) kind: RecordKind,
    pub(crate) id: i64,
    pub(crate) description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn book_pages_only_accept_digits() {
        let mut form = BookForm {
            active: BookField::Pages,
            ..BookForm::default()
        };
        assert!(form.push_char('4'));
        assert!(!form.push_char('x'));
        assert_eq!(form.pages, "4");
    }

    #[test]
    fn book_parse_reports_first_problem() {
        let mut form = BookForm::default();
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Title is required!");
        form.title = "Dune".into();
        form.author = "Frank Herbert".into();
        form.pages = "0".into();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Pages must be greater than 0!"
        );
        form.pages = " 412 ".into();
        assert_eq!(
            form.parse_inputs().unwrap(),
            ("Dune".to_string(), "Frank Herbert".to_string(), 412)
        );
    }

    #[test]
    fn book_form_round_trips_an_existing_book() {
        let book = Book::new("Dune", "Frank Herbert", 412)
            .unwrap()
            .with_id(4)
            .unwrap();
        let form = BookForm::from_book(&book);
        assert_eq!(form.id, Some(4));
        assert_eq!(form.cursor(), (0, "Title: ".len() + 4));
    }

    #[test]
    fn member_form_toggles_and_trims() {
        let mut form = MemberForm::default();
        for ch in " Ada ".chars() {
            form.push_char(ch);
        }
        form.toggle_field();
        for ch in "Lovelace".chars() {
            form.push_char(ch);
        }
        assert_eq!(
            form.parse_inputs().unwrap(),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        form.backspace();
        assert_eq!(form.family, "Lovelac");
    }

    #[test]
    fn borrow_form_defaults_dates() {
        let form = BorrowForm {
            member: AutocompleteField::with_text("3-Ada Lovelace"),
            book: AutocompleteField::with_text("7-Dune by Frank Herbert"),
            ..BorrowForm::default()
        };
        let inputs = form.parse_inputs(date(2024, 6, 1)).unwrap();
        assert_eq!(inputs.member_id, 3);
        assert_eq!(inputs.book_id, 7);
        assert_eq!(inputs.borrow_date, date(2024, 6, 1));
        assert_eq!(inputs.return_date, None);
    }

    #[test]
    fn borrow_form_validates_pickers_and_dates() {
        let mut form = BorrowForm::default();
        let today = date(2024, 6, 1);
        assert_eq!(
            form.parse_inputs(today).unwrap_err().to_string(),
            "Please select a member."
        );
        form.member = AutocompleteField::with_text("Ada");
        assert_eq!(
            form.parse_inputs(today).unwrap_err().to_string(),
            "Member ID not valid!"
        );
        form.member = AutocompleteField::with_text("3-Ada Lovelace");
        form.book = AutocompleteField::with_text("7-Dune by Frank Herbert");
        form.return_date = "2024-13-01".into();
        assert!(form
            .parse_inputs(today)
            .unwrap_err()
            .to_string()
            .starts_with("Invalid return date!"));
    }

    #[test]
    fn borrow_date_fields_reject_letters() {
        let mut form = BorrowForm {
            active: BorrowField::BorrowDate,
            ..BorrowForm::default()
        };
        assert!(form.push_char('2'));
        assert!(form.push_char('-'));
        assert!(!form.push_char('a'));
        assert_eq!(form.borrow_date, "2-");
    }

    #[test]
    fn only_the_focused_picker_suggests() {
        let members = vec!["1-Ada Lovelace".to_string()];
        let books = vec!["1-Dune by Frank Herbert".to_string()];
        let mut form = BorrowForm::default();
        form.refresh_suggestions(&members, &books);
        assert!(form.member.is_open());
        assert!(!form.book.is_open());

        form.next_field();
        form.refresh_suggestions(&members, &books);
        assert!(!form.member.is_open());
        assert!(form.book.is_open());

        form.next_field();
        form.refresh_suggestions(&members, &books);
        assert!(form.active_autocomplete().is_none());
        assert!(!form.book.is_open());
    }

    #[test]
    fn borrow_form_loads_labels_for_known_rows() {
        let member = Member::new("Ada", "Lovelace").unwrap().with_id(1).unwrap();
        let borrow = Borrow::new(1, 9, date(2024, 1, 2), Some(date(2024, 1, 5)))
            .unwrap()
            .with_id(5)
            .unwrap();
        let form = BorrowForm::from_borrow(&borrow, &[member], &[]);
        assert_eq!(form.member.text, "1-Ada Lovelace");
        assert_eq!(form.book.text, "9");
        assert_eq!(form.borrow_date, "2024-01-02");
        assert_eq!(form.return_date, "2024-01-05");
        assert_eq!(form.book.selected_id(), Some(9));
    }
}

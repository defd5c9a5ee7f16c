use crate::db::{ReportKind, ReportTable};

/// Top-level tabs, in display order.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Tab {
    Members,
    Books,
    Borrows,
    Reports,
}

impl Tab {
    pub(crate) const ALL: [Tab; 4] = [Tab::Members, Tab::Books, Tab::Borrows, Tab::Reports];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Members => "Members",
            Tab::Books => "Books",
            Tab::Borrows => "Borrows",
            Tab::Reports => "Reports",
        }
    }

    pub(crate) fn index(self) -> usize {
        Tab::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    /// Step through the tabs, wrapping at both ends.
    pub(crate) fn cycle(self, offset: isize) -> Tab {
        let len = Tab::ALL.len() as isize;
        let next = (self.index() as isize + offset).rem_euclid(len);
        Tab::ALL[next as usize]
    }

    /// `'1'`..`'4'` shortcuts.
    pub(crate) fn from_digit(ch: char) -> Option<Tab> {
        let idx = ch.to_digit(10)? as usize;
        idx.checked_sub(1).and_then(|i| Tab::ALL.get(i).copied())
    }
}

/// Rows of one entity table plus the highlighted row.
pub(crate) struct RecordList<T> {
    pub(crate) rows: Vec<T>,
    pub(crate) selected: usize,
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            selected: 0,
        }
    }
}

impl<T> RecordList<T> {
    pub(crate) fn new(rows: Vec<T>) -> Self {
        let mut list = Self::default();
        list.set_rows(rows);
        list
    }

    pub(crate) fn current(&self) -> Option<&T> {
        self.rows.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    /// Replace the rows, keeping the selection in range.
    pub(crate) fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.ensure_in_bounds();
    }

    /// Move the highlight to the first row matching `pred`, if any.
    pub(crate) fn focus(&mut self, pred: impl Fn(&T) -> bool) {
        if let Some(idx) = self.rows.iter().position(pred) {
            self.selected = idx;
        }
    }

    fn ensure_in_bounds(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }
}

/// The Reports tab: a menu of reports.
#[derive(Default)]
pub(crate) struct ReportsScreen {
    pub(crate) selected: usize,
}

impl ReportsScreen {
    pub(crate) fn current(&self) -> ReportKind {
        ReportKind::ALL[self.selected.min(ReportKind::ALL.len() - 1)]
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let last = ReportKind::ALL.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = ReportKind::ALL.len() - 1;
    }
}

/// An open report popup. Rows are shown through `visible`, the indices that
/// pass the filter in the current sort order.
pub(crate) struct ReportView {
    pub(crate) table: ReportTable,
    pub(crate) filter: String,
    pub(crate) editing_filter: bool,
    pub(crate) sort_column: usize,
    pub(crate) descending: bool,
    pub(crate) visible: Vec<usize>,
    pub(crate) selected: usize,
}

impl ReportView {
    /// Open `table` sorted ascending on its first column.
    pub(crate) fn new(table: ReportTable) -> Self {
        let mut view = Self {
            table,
            filter: String::new(),
            editing_filter: false,
            sort_column: 0,
            descending: false,
            visible: Vec::new(),
            selected: 0,
        };
        view.refresh();
        view
    }

    /// Rows currently on screen, in display order.
    pub(crate) fn rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.visible.iter().map(|idx| &self.table.rows[*idx])
    }

    pub(crate) fn push_filter_char(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        self.filter.push(ch);
        self.refresh();
    }

    pub(crate) fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.refresh();
    }

    pub(crate) fn clear_filter(&mut self) {
        self.filter.clear();
        self.refresh();
    }

    /// Sort on `column`. Picking the current column again flips the
    /// direction; a new column starts ascending.
    pub(crate) fn sort_by(&mut self, column: usize) {
        let columns = self.table.headings().len();
        if columns == 0 {
            return;
        }
        let column = column % columns;
        if column == self.sort_column {
            self.descending = !self.descending;
        } else {
            self.sort_column = column;
            self.descending = false;
        }
        self.refresh();
    }

    /// Move the sort to the neighbouring column, wrapping at both ends.
    pub(crate) fn cycle_sort_column(&mut self, offset: isize) {
        let columns = self.table.headings().len() as isize;
        if columns == 0 {
            return;
        }
        let next = (self.sort_column as isize + offset).rem_euclid(columns);
        self.sort_by(next as usize);
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    fn refresh(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        let rows = &self.table.rows;
        let mut visible: Vec<usize> = (0..rows.len())
            .filter(|idx| {
                needle.is_empty()
                    || rows[*idx]
                        .iter()
                        .any(|cell| cell.to_lowercase().contains(&needle))
            })
            .collect();

        let column = self.sort_column;
        let cell = |idx: usize| rows[idx].get(column).map(String::as_str).unwrap_or("");
        // Numbers only compare as numbers when the whole column is numeric.
        let numeric = visible.iter().all(|idx| {
            let value = cell(*idx);
            !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
        });
        visible.sort_by(|a, b| {
            let (a, b) = (cell(*a), cell(*b));
            let order = if numeric {
                a.parse::<u64>()
                    .unwrap_or(u64::MAX)
                    .cmp(&b.parse::<u64>().unwrap_or(u64::MAX))
            } else {
                a.to_lowercase().cmp(&b.to_lowercase())
            };
            if self.descending {
                order.reverse()
            } else {
                order
            }
        });

        self.visible = visible;
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_cycle_and_map_digits() {
        assert_eq!(Tab::Members.cycle(-1), Tab::Reports);
        assert_eq!(Tab::Reports.cycle(1), Tab::Members);
        assert_eq!(Tab::from_digit('3'), Some(Tab::Borrows));
        assert_eq!(Tab::from_digit('0'), None);
        assert_eq!(Tab::from_digit('5'), None);
    }

    #[test]
    fn record_list_keeps_selection_in_range() {
        let mut list = RecordList::new(vec![1, 2, 3]);
        list.move_selection(10);
        assert_eq!(list.current(), Some(&3));
        list.set_rows(vec![1]);
        assert_eq!(list.selected, 0);
        list.set_rows(Vec::new());
        assert_eq!(list.current(), None);
        list.move_selection(1);
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn record_list_focus_finds_rows() {
        let mut list = RecordList::new(vec![10, 20, 30]);
        list.focus(|v| *v == 30);
        assert_eq!(list.selected, 2);
        list.focus(|v| *v == 99);
        assert_eq!(list.selected, 2);
        list.select_first();
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn reports_menu_is_bounded() {
        let mut menu = ReportsScreen::default();
        menu.move_selection(-1);
        assert_eq!(menu.current(), ReportKind::AllBorrows);
        menu.move_selection(100);
        assert_eq!(menu.current(), ReportKind::BorrowCounts);
    }

    fn report(rows: &[&[&str]]) -> ReportView {
        ReportView::new(ReportTable {
            kind: ReportKind::NeverBorrowedBooks,
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        })
    }

    fn ids(view: &ReportView) -> Vec<&str> {
        view.rows().map(|row| row[0].as_str()).collect()
    }

    #[test]
    fn report_opens_sorted_numerically_on_the_first_column() {
        let view = report(&[
            &["10", "Walden", "Henry Thoreau"],
            &["2", "Dune", "Frank Herbert"],
            &["1", "Emma", "Jane Austen"],
        ]);
        assert_eq!(ids(&view), vec!["1", "2", "10"]);
    }

    #[test]
    fn sorting_the_same_column_flips_and_a_new_one_resets() {
        let mut view = report(&[
            &["1", "emma", "Jane Austen"],
            &["2", "Dune", "Frank Herbert"],
            &["3", "Walden", "Henry Thoreau"],
        ]);
        view.sort_by(0);
        assert!(view.descending);
        assert_eq!(ids(&view), vec!["3", "2", "1"]);

        view.cycle_sort_column(1);
        assert_eq!(view.sort_column, 1);
        assert!(!view.descending);
        assert_eq!(ids(&view), vec!["2", "1", "3"]);

        view.cycle_sort_column(-2);
        assert_eq!(view.sort_column, 2);
    }

    #[test]
    fn filter_matches_any_cell_ignoring_case() {
        let mut view = report(&[
            &["1", "Emma", "Jane Austen"],
            &["2", "Dune", "Frank Herbert"],
            &["3", "Persuasion", "Jane Austen"],
        ]);
        view.select_last();
        for ch in "AUSTEN".chars() {
            view.push_filter_char(ch);
        }
        assert_eq!(ids(&view), vec!["1", "3"]);
        assert_eq!(view.selected, 1);

        view.push_filter_char('x');
        assert!(ids(&view).is_empty());
        assert_eq!(view.selected, 0);
        view.move_selection(1);

        view.clear_filter();
        assert_eq!(view.rows().count(), 3);
    }

    #[test]
    fn sort_order_survives_filtering() {
        let mut view = report(&[
            &["1", "Emma", "Jane Austen"],
            &["2", "Dune", "Frank Herbert"],
            &["3", "Persuasion", "Jane Austen"],
        ]);
        view.sort_by(0);
        view.push_filter_char('j');
        assert_eq!(ids(&view), vec!["3", "1"]);
        view.pop_filter_char();
        assert_eq!(ids(&view), vec!["3", "2", "1"]);
    }
}

use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DatePart {
    Day,
    Month,
    Year,
}

/// Day/month/year entry for a date shown as `DD/MM/YYYY`.
///
/// Digits typed into the active part replace it once the part is complete.
/// A date that does not exist, or falls before `min_date`, is ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct DateInputState {
    pub date: NaiveDate,
    pub min_date: Option<NaiveDate>,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate, min_date: Option<NaiveDate>) -> Self {
        let date = match min_date {
            Some(min) if date < min => min,
            _ => date,
        };
        Self {
            date,
            min_date,
            date_part: DatePart::Day,
            current_date_input: String::new(),
        }
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Day => DatePart::Month,
            DatePart::Month => DatePart::Year,
            DatePart::Year => DatePart::Day,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Day => DatePart::Year,
            DatePart::Month => DatePart::Day,
            DatePart::Year => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    fn part_width(&self) -> usize {
        match self.date_part {
            DatePart::Day | DatePart::Month => 2,
            DatePart::Year => 4,
        }
    }

    fn try_set(&mut self, year: i32, month: u32, day: u32) {
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) {
            if self.min_date.is_none_or(|min| candidate >= min) {
                self.date = candidate;
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.current_date_input.push(c);
                if self.current_date_input.len() < self.part_width() {
                    return;
                }

                if let Ok(value) = self.current_date_input.parse::<u32>() {
                    let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
                    match self.date_part {
                        DatePart::Day => self.try_set(year, month, value),
                        DatePart::Month => self.try_set(year, value, day),
                        DatePart::Year if (1900..=2100).contains(&value) => {
                            self.try_set(value as i32, month, day)
                        }
                        DatePart::Year => {}
                    }
                }
                self.current_date_input.clear();
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    pub fn get_display_string(&self) -> String {
        let day = format!("{:02}", self.date.day());
        let month = format!("{:02}", self.date.month());
        let year = format!("{:04}", self.date.year());

        let placeholder = |part: &str| {
            if self.current_date_input.is_empty() {
                format!("[{part}]")
            } else {
                format!("[{}]", self.current_date_input)
            }
        };

        match self.date_part {
            DatePart::Day => format!("{}/{month}/{year}", placeholder(&day)),
            DatePart::Month => format!("{day}/{}/{year}", placeholder(&month)),
            DatePart::Year => format!("{day}/{month}/{}", placeholder(&year)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_each_part_moves_the_date() {
        let mut state = DateInputState::new(date(2024, 1, 31), None);

        type_digits(&mut state, "15");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "03");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "2025");

        assert_eq!(state.date, date(2025, 3, 15));
    }

    #[test]
    fn impossible_dates_are_ignored() {
        let mut state = DateInputState::new(date(2024, 1, 31), None);
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "02");

        assert_eq!(state.date, date(2024, 1, 31));
        assert!(state.current_date_input.is_empty());
    }

    #[test]
    fn never_goes_below_the_minimum() {
        let mut state = DateInputState::new(date(2024, 1, 1), Some(date(2024, 1, 10)));
        assert_eq!(state.date, date(2024, 1, 10));

        type_digits(&mut state, "05");
        assert_eq!(state.date, date(2024, 1, 10));

        type_digits(&mut state, "20");
        assert_eq!(state.date, date(2024, 1, 20));
    }

    #[test]
    fn display_marks_the_active_part() {
        let mut state = DateInputState::new(date(2024, 2, 9), None);
        assert_eq!(state.get_display_string(), "[09]/02/2024");

        state.handle_input(KeyCode::Left);
        state.handle_input(KeyCode::Char('2'));
        assert_eq!(state.get_display_string(), "09/02/[2]");
    }
}

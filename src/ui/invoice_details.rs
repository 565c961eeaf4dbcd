use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode};
use serde_json::{Value, json};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::consts::{CURRENCIES, UNIT_OPTIONS, VAT_PERCENT_OPTIONS};
use crate::entities::{EntityError, InvoiceEntity};
use crate::handler::{HandlerError, InvoiceBackend};
use crate::models::{InvoiceField, ProductAttribute, dates, validate_date, validate_invoice_no};
use crate::ui::components::date_input::DateInputState;

// Focusable parts of the page, top to bottom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailsField {
    Client,
    Business,
    InvoiceNo,
    Currency,
    VatPercent,
    IssuedAt,
    DueTo,
    Note,
    Products,
}

impl DetailsField {
    const ORDER: [DetailsField; 9] = [
        DetailsField::Client,
        DetailsField::Business,
        DetailsField::InvoiceNo,
        DetailsField::Currency,
        DetailsField::VatPercent,
        DetailsField::IssuedAt,
        DetailsField::DueTo,
        DetailsField::Note,
        DetailsField::Products,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductColumn {
    Description,
    Quantity,
    Unit,
    Price,
}

impl ProductColumn {
    const ORDER: [ProductColumn; 4] = [
        ProductColumn::Description,
        ProductColumn::Quantity,
        ProductColumn::Unit,
        ProductColumn::Price,
    ];

    fn attribute(self) -> ProductAttribute {
        match self {
            ProductColumn::Description => ProductAttribute::Description,
            ProductColumn::Quantity => ProductAttribute::Quantity,
            ProductColumn::Unit => ProductAttribute::Unit,
            ProductColumn::Price => ProductAttribute::Price,
        }
    }

    fn shift(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let index = Self::ORDER.iter().position(|c| *c == self).unwrap_or(0);
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        Self::ORDER[next]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
    Warning,
}

/// Inline message shown after a failed change
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// API rejections are page errors; everything else is a warning.
    fn from_error(err: &EntityError) -> Self {
        let level = if err.is_http() { NoticeLevel::Error } else { NoticeLevel::Warning };
        Self {
            level,
            message: err.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Editing {
    None,
    Text(String),
    Choice(usize),
    Date(DateInputState),
}

pub enum InvoiceDetailsAction {
    Quit,
}

pub struct InvoiceDetailsState {
    invoice: InvoiceEntity,
    client_names: Vec<String>,
    business_names: Vec<String>,
    focus: DetailsField,
    in_products: bool,
    product_column: ProductColumn,
    products_table: TableState,
    editing: Editing,
    notice: Option<Notice>,
    halted: bool,
}

impl InvoiceDetailsState {
    /// Build the page, fetching the client and business names to choose from.
    /// If either list cannot be loaded the page shows only that failure.
    pub async fn load<B: InvoiceBackend + ?Sized>(backend: &B, invoice: InvoiceEntity) -> Self {
        let mut state = Self {
            invoice,
            client_names: Vec::new(),
            business_names: Vec::new(),
            focus: DetailsField::Client,
            in_products: false,
            product_column: ProductColumn::Description,
            products_table: TableState::default(),
            editing: Editing::None,
            notice: None,
            halted: false,
        };

        match backend.get_all_clients_names().await {
            Ok(names) => state.client_names = names,
            Err(err) => {
                state.halt(err);
                return state;
            }
        }
        match backend.get_all_businesses_names().await {
            Ok(names) => state.business_names = names,
            Err(err) => state.halt(err),
        }

        state
    }

    fn halt(&mut self, err: HandlerError) {
        tracing::error!(error = %err, "could not load the invoice page");
        self.notice = Some(Notice::from_error(&EntityError::Handler(err)));
        self.halted = true;
    }

    pub fn invoice(&self) -> &InvoiceEntity {
        &self.invoice
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn show_error(&mut self, err: &EntityError) {
        self.notice = Some(Notice::from_error(err));
    }

    fn report(&mut self, err: EntityError) {
        tracing::warn!(error = %err, http = err.is_http(), "invoice change failed");
        self.show_error(&err);
    }

    fn settle(&mut self, result: Result<(), EntityError>) {
        if let Err(err) = result {
            self.report(err);
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.invoice.products().len();
        if len == 0 {
            self.products_table.select(None);
            self.in_products = false;
        } else if self.products_table.selected().is_none_or(|i| i >= len) {
            self.products_table.select(Some(len - 1));
        }
    }

    fn selected_product(&self) -> Option<usize> {
        self.products_table
            .selected()
            .filter(|i| *i < self.invoice.products().len())
    }

    // Change callbacks. Each performs at most one round of remote calls and
    // turns any failure into a notice.

    async fn on_change_client<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, name: &str) {
        if name.is_empty() {
            return;
        }
        let result = match backend.get_client_details(name).await {
            Ok(client) => self.invoice.edit_client(backend, client).await,
            Err(err) => Err(err.into()),
        };
        self.settle(result);
    }

    async fn on_change_business<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, name: &str) {
        if name.is_empty() {
            return;
        }
        let result = match backend.get_business_details(name).await {
            Ok(business) => self.invoice.edit_business(backend, business).await,
            Err(err) => Err(err.into()),
        };
        self.settle(result);
    }

    async fn on_change_details<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        field: InvoiceField,
        value: Value,
    ) {
        let result = self.apply_details(backend, field, value).await;
        self.settle(result);
    }

    async fn apply_details<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        field: InvoiceField,
        value: Value,
    ) -> Result<(), EntityError> {
        match (field, value.as_str()) {
            (InvoiceField::InvoiceNo, Some(invoice_no)) => validate_invoice_no(invoice_no)?,
            (field, Some(date)) if field.is_date() => {
                validate_date(date)?;
            }
            _ => {}
        }
        self.invoice.edit_field(backend, field, value).await
    }

    async fn on_change_product<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        index: usize,
        attribute: ProductAttribute,
        value: Value,
    ) {
        let result = self.invoice.edit_product(backend, index, attribute, value).await;
        self.settle(result);
    }

    async fn add_product<B: InvoiceBackend + ?Sized>(&mut self, backend: &B) {
        let result = self.invoice.add_product(backend, "", 0.0, "", 0.0).await;
        let added = result.is_ok();
        self.settle(result);
        if added {
            let last = self.invoice.products().len().saturating_sub(1);
            self.products_table.select(Some(last));
        }
    }

    async fn delete_product<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, index: usize) {
        let result = self.invoice.delete_product(backend, index).await;
        self.settle(result);
    }

    async fn step_vat<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, forward: bool) {
        let current = VAT_PERCENT_OPTIONS
            .iter()
            .position(|p| *p == self.invoice.header().vat_percent)
            .unwrap_or(0);
        let next = if forward {
            (current + 1).min(VAT_PERCENT_OPTIONS.len() - 1)
        } else {
            current.saturating_sub(1)
        };
        let percent = VAT_PERCENT_OPTIONS[next];
        if percent != self.invoice.header().vat_percent {
            self.on_change_details(backend, InvoiceField::VatPercent, json!(percent))
                .await;
        }
    }

    // Editing

    fn choice_options(&self) -> Vec<String> {
        if self.in_products {
            return UNIT_OPTIONS.iter().map(|u| u.to_string()).collect();
        }
        match self.focus {
            DetailsField::Client => self.client_names.clone(),
            DetailsField::Business => self.business_names.clone(),
            DetailsField::Currency => CURRENCIES.iter().map(|c| c.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    fn choice_start(&mut self, current: Option<&str>) -> Editing {
        let options = self.choice_options();
        if options.is_empty() {
            self.notice = Some(Notice::warning("There is nothing to choose from yet"));
            return Editing::None;
        }
        let index = current
            .and_then(|value| options.iter().position(|o| o == value))
            .unwrap_or(0);
        Editing::Choice(index)
    }

    fn start_editing(&mut self) {
        let header = self.invoice.header().clone();
        let today = Local::now().date_naive();
        let stored = |value: &Option<String>| {
            value.as_deref().and_then(|v| dates::parse_date(v).ok())
        };

        self.editing = match self.focus {
            DetailsField::Client => {
                let current = self.invoice.client().map(|c| c.name.clone());
                self.choice_start(current.as_deref())
            }
            DetailsField::Business => {
                let current = self.invoice.business().map(|b| b.name.clone());
                self.choice_start(current.as_deref())
            }
            DetailsField::Currency => self.choice_start(Some(&header.currency)),
            DetailsField::InvoiceNo => Editing::Text(header.invoice_no),
            DetailsField::Note => Editing::Text(header.note),
            DetailsField::IssuedAt => {
                Editing::Date(DateInputState::new(stored(&header.issued_at).unwrap_or(today), None))
            }
            DetailsField::DueTo => {
                let issued = stored(&header.issued_at);
                let due = stored(&header.due_to).or(issued).unwrap_or(today);
                Editing::Date(DateInputState::new(due, issued))
            }
            DetailsField::VatPercent => Editing::None,
            DetailsField::Products => {
                if !self.invoice.products().is_empty() {
                    self.in_products = true;
                    self.clamp_selection();
                }
                Editing::None
            }
        };
    }

    fn start_cell_editing(&mut self) {
        let Some(product) = self
            .selected_product()
            .map(|i| self.invoice.products()[i].clone())
        else {
            return;
        };
        self.editing = match self.product_column {
            ProductColumn::Description => Editing::Text(product.description),
            ProductColumn::Quantity => Editing::Text(product.quantity.to_string()),
            ProductColumn::Price => Editing::Text(product.price.to_string()),
            ProductColumn::Unit => self.choice_start(Some(&product.unit)),
        };
    }

    async fn commit_text<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, buffer: String) {
        if self.in_products {
            let Some(row) = self.selected_product() else {
                return;
            };
            let attribute = self.product_column.attribute();
            match attribute {
                ProductAttribute::Description => {
                    self.on_change_product(backend, row, attribute, json!(buffer)).await
                }
                ProductAttribute::Quantity | ProductAttribute::Price => {
                    match buffer.trim().parse::<f64>() {
                        Ok(number) => {
                            self.on_change_product(backend, row, attribute, json!(number))
                                .await
                        }
                        Err(_) => {
                            let message = format!("{attribute} must be a number");
                            self.notice = Some(Notice::warning(message));
                        }
                    }
                }
                ProductAttribute::Unit => {}
            }
            return;
        }

        match self.focus {
            DetailsField::InvoiceNo => {
                self.on_change_details(backend, InvoiceField::InvoiceNo, json!(buffer)).await
            }
            DetailsField::Note => {
                self.on_change_details(backend, InvoiceField::Note, json!(buffer)).await
            }
            _ => {}
        }
    }

    async fn commit_choice<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, index: usize) {
        let Some(choice) = self.choice_options().get(index).cloned() else {
            return;
        };

        if self.in_products {
            if let Some(row) = self.selected_product() {
                self.on_change_product(backend, row, ProductAttribute::Unit, json!(choice)).await;
            }
            return;
        }

        match self.focus {
            DetailsField::Client => self.on_change_client(backend, &choice).await,
            DetailsField::Business => self.on_change_business(backend, &choice).await,
            DetailsField::Currency => {
                self.on_change_details(backend, InvoiceField::Currency, json!(choice)).await
            }
            _ => {}
        }
    }

    async fn commit_date<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, date: NaiveDate) {
        let field = match self.focus {
            DetailsField::IssuedAt => InvoiceField::IssuedAt,
            DetailsField::DueTo => InvoiceField::DueTo,
            _ => return,
        };
        self.on_change_details(backend, field, json!(dates::to_stored(date))).await;
    }

    async fn edit<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        editing: Editing,
        key: KeyCode,
    ) {
        match (editing, key) {
            (_, KeyCode::Esc) => {}
            (Editing::Text(buffer), KeyCode::Enter) => self.commit_text(backend, buffer).await,
            (Editing::Text(mut buffer), KeyCode::Char(c)) => {
                buffer.push(c);
                self.editing = Editing::Text(buffer);
            }
            (Editing::Text(mut buffer), KeyCode::Backspace) => {
                buffer.pop();
                self.editing = Editing::Text(buffer);
            }
            (Editing::Choice(index), KeyCode::Enter) => self.commit_choice(backend, index).await,
            (Editing::Choice(index), KeyCode::Left | KeyCode::Up) => {
                let len = self.choice_options().len().max(1);
                self.editing = Editing::Choice((index + len - 1) % len);
            }
            (Editing::Choice(index), KeyCode::Right | KeyCode::Down) => {
                let len = self.choice_options().len().max(1);
                self.editing = Editing::Choice((index + 1) % len);
            }
            (Editing::Date(date), KeyCode::Enter) => self.commit_date(backend, date.date).await,
            (Editing::Date(mut date), key) => {
                date.handle_input(key);
                self.editing = Editing::Date(date);
            }
            (editing, _) => self.editing = editing,
        }
    }

    async fn navigate_products<B: InvoiceBackend + ?Sized>(&mut self, backend: &B, key: KeyCode) {
        let len = self.invoice.products().len();
        match key {
            KeyCode::Esc => self.in_products = false,
            KeyCode::Up if len > 0 => {
                let i = self.selected_product().map_or(0, |i| (i + len - 1) % len);
                self.products_table.select(Some(i));
            }
            KeyCode::Down if len > 0 => {
                let i = self.selected_product().map_or(0, |i| (i + 1) % len);
                self.products_table.select(Some(i));
            }
            KeyCode::Left => self.product_column = self.product_column.shift(false),
            KeyCode::Right => self.product_column = self.product_column.shift(true),
            KeyCode::Char('a') => self.add_product(backend).await,
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(row) = self.selected_product() {
                    self.delete_product(backend, row).await;
                }
            }
            KeyCode::Enter => self.start_cell_editing(),
            _ => {}
        }
    }

    async fn navigate<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        key: KeyCode,
    ) -> Option<InvoiceDetailsAction> {
        if self.in_products {
            self.navigate_products(backend, key).await;
            return None;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') => return Some(InvoiceDetailsAction::Quit),
            KeyCode::Down | KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::Up | KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Left if self.focus == DetailsField::VatPercent => {
                self.step_vat(backend, false).await
            }
            KeyCode::Right if self.focus == DetailsField::VatPercent => {
                self.step_vat(backend, true).await
            }
            KeyCode::Char('a') => self.add_product(backend).await,
            KeyCode::Enter => self.start_editing(),
            _ => {}
        }
        None
    }
}

/// Apply one key press to the page
pub async fn handle_key<B: InvoiceBackend + ?Sized>(
    state: &mut InvoiceDetailsState,
    backend: &B,
    key: KeyCode,
) -> Option<InvoiceDetailsAction> {
    if state.halted {
        return matches!(key, KeyCode::Esc | KeyCode::Char('q'))
            .then_some(InvoiceDetailsAction::Quit);
    }

    // Clear any existing notice
    state.notice = None;

    match std::mem::replace(&mut state.editing, Editing::None) {
        Editing::None => state.navigate(backend, key).await,
        editing => {
            state.edit(backend, editing, key).await;
            None
        }
    }
}

pub async fn handle_input<B: InvoiceBackend + ?Sized>(
    state: &mut InvoiceDetailsState,
    backend: &B,
) -> Result<Option<InvoiceDetailsAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, backend, key.code).await);
    }
    Ok(None)
}

// Rendering

fn field_style(focused: bool, editing: bool) -> Style {
    match (focused, editing) {
        (true, true) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

fn field_block(title: &str, focused: bool, editing: bool) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(field_style(focused, editing))
}

impl InvoiceDetailsState {
    fn is_editing(&self, field: DetailsField) -> bool {
        self.focus == field && !self.in_products && self.editing != Editing::None
    }

    fn display_choice(
        &self,
        field: DetailsField,
        current: Option<&str>,
        placeholder: &str,
    ) -> String {
        if self.is_editing(field) {
            if let Editing::Choice(index) = self.editing {
                let options = self.choice_options();
                return format!("< {} >", options.get(index).map_or("", String::as_str));
            }
        }
        match current {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => placeholder.to_string(),
        }
    }

    fn display_text(&self, field: DetailsField, current: &str) -> String {
        match &self.editing {
            Editing::Text(buffer) if self.is_editing(field) => format!("{buffer}|"),
            _ => current.to_string(),
        }
    }

    fn display_date(&self, field: DetailsField, current: Option<&str>) -> String {
        match &self.editing {
            Editing::Date(date) if self.is_editing(field) => date.get_display_string(),
            _ => current
                .and_then(|v| dates::parse_date(v).ok())
                .map_or_else(|| "--/--/----".to_string(), dates::to_stored),
        }
    }
}

pub fn render_invoice_details<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceDetailsState) {
    let has_products = !state.invoice.products().is_empty();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),                                  // Title
                Constraint::Length(5),                                  // Client and business
                Constraint::Length(3),                                  // Number, currency, VAT
                Constraint::Length(6),                                  // Dates and note
                Constraint::Min(5),                                     // Products
                Constraint::Length(if has_products { 5 } else { 0 }),   // Totals
                Constraint::Length(3),                                  // Help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let title_text = if state.invoice.is_persisted() {
        format!("Invoice {}", state.invoice.header().invoice_id)
    } else {
        "New invoice (saved once a client and a business are selected)".to_string()
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    if !state.halted {
        render_parties(frame, state, chunks[1]);
        render_header(frame, state, chunks[2]);
        render_dates_and_note(frame, state, chunks[3]);
        render_products(frame, state, chunks[4]);
        if has_products {
            render_totals(frame, state, chunks[5]);
        }
    }

    let help_text = if state.halted {
        "q - Quit"
    } else {
        match (&state.editing, state.in_products) {
            (Editing::Text(_), _) => "Type to edit | Enter - Save | Esc - Cancel",
            (Editing::Choice(_), _) => "Left/Right - Choose | Enter - Save | Esc - Cancel",
            (Editing::Date(_), _) => {
                "Digits - Set part | Left/Right - Day/Month/Year | Enter - Save | Esc - Cancel"
            }
            (Editing::None, true) => {
                "Up/Down - Row | Left/Right - Column | Enter - Edit cell | A - Add | D - Delete \
                 | Esc - Back"
            }
            (Editing::None, false) => {
                "Up/Down - Navigate | Enter - Edit | Left/Right - VAT | A - Add product | q - Quit"
            }
        }
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[6]);

    if let Some(notice) = &state.notice {
        let size = frame.size();
        render_notice(frame, size, notice);
    }
}

fn render_parties<B: Backend>(frame: &mut Frame<B>, state: &InvoiceDetailsState, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let client = state.invoice.client();
    let client_lines = vec![
        Spans::from(state.display_choice(
            DetailsField::Client,
            client.map(|c| c.name.as_str()),
            "Select client",
        )),
        Spans::from(client.map_or_else(String::new, |c| {
            format!("{}, {} {}", c.street, c.post_code, c.town)
        })),
        Spans::from(client.map_or_else(String::new, |c| {
            format!("{} | VAT {}", c.country, c.vat_no)
        })),
    ];
    let focused = state.focus == DetailsField::Client && !state.in_products;
    frame.render_widget(
        Paragraph::new(client_lines).block(field_block(
            "Client details",
            focused,
            state.is_editing(DetailsField::Client),
        )),
        columns[0],
    );

    let business = state.invoice.business();
    let business_lines = vec![
        Spans::from(state.display_choice(
            DetailsField::Business,
            business.map(|b| b.name.as_str()),
            "Select business",
        )),
        Spans::from(business.map_or_else(String::new, |b| {
            format!("{}, {} {}", b.street, b.post_code, b.town)
        })),
        Spans::from(business.map_or_else(String::new, |b| {
            format!("VAT {} | IBAN {}", b.vat_no, b.iban)
        })),
    ];
    let focused = state.focus == DetailsField::Business && !state.in_products;
    frame.render_widget(
        Paragraph::new(business_lines).block(field_block(
            "Business details",
            focused,
            state.is_editing(DetailsField::Business),
        )),
        columns[1],
    );
}

fn render_header<B: Backend>(frame: &mut Frame<B>, state: &InvoiceDetailsState, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(2, 4),
            ]
            .as_ref(),
        )
        .split(area);
    let header = state.invoice.header();
    let focused = |field: DetailsField| state.focus == field && !state.in_products;

    let block = |title: &'static str, field: DetailsField| {
        field_block(title, focused(field), state.is_editing(field))
    };

    let invoice_no = Paragraph::new(state.display_text(DetailsField::InvoiceNo, &header.invoice_no))
        .block(block("Invoice no.", DetailsField::InvoiceNo));
    frame.render_widget(invoice_no, columns[0]);

    let currency = Paragraph::new(state.display_choice(
        DetailsField::Currency,
        Some(&header.currency),
        "Select currency",
    ))
    .block(block("Currency", DetailsField::Currency));
    frame.render_widget(currency, columns[1]);

    let slider: Vec<Span> = VAT_PERCENT_OPTIONS
        .iter()
        .map(|percent| {
            if *percent == header.vat_percent {
                Span::styled(format!("[{percent}] "), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(format!(" {percent}  "))
            }
        })
        .collect();
    let vat = Paragraph::new(Spans::from(slider))
        .block(field_block("VAT %", focused(DetailsField::VatPercent), false));
    frame.render_widget(vat, columns[2]);
}

fn render_dates_and_note<B: Backend>(
    frame: &mut Frame<B>,
    state: &InvoiceDetailsState,
    area: Rect,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);
    let dates_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)].as_ref())
        .split(columns[0]);
    let header = state.invoice.header();
    let focused = |field: DetailsField| state.focus == field && !state.in_products;

    let block = |title: &'static str, field: DetailsField| {
        field_block(title, focused(field), state.is_editing(field))
    };

    let issued_at = state.display_date(DetailsField::IssuedAt, header.issued_at.as_deref());
    let issued = Paragraph::new(issued_at)
        .block(block("Issued", DetailsField::IssuedAt));
    frame.render_widget(issued, dates_rows[0]);

    let due = Paragraph::new(state.display_date(DetailsField::DueTo, header.due_to.as_deref()))
        .block(block("Due", DetailsField::DueTo));
    frame.render_widget(due, dates_rows[1]);

    let note = Paragraph::new(state.display_text(DetailsField::Note, &header.note))
        .block(block("Note", DetailsField::Note));
    frame.render_widget(note, columns[1]);
}

fn render_products<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceDetailsState, area: Rect) {
    let selected = state.selected_product();
    let rows: Vec<Row> = state
        .invoice
        .products()
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let cell = |column: ProductColumn, value: String| {
                let active = state.in_products
                    && selected == Some(index)
                    && state.product_column == column;
                match (&state.editing, active) {
                    (Editing::Text(buffer), true) => Cell::from(format!("{buffer}|"))
                        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                    (Editing::Choice(i), true) => {
                        Cell::from(format!("< {} >", UNIT_OPTIONS.get(*i).copied().unwrap_or("")))
                            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                    }
                    (_, true) => Cell::from(value)
                        .style(Style::default().add_modifier(Modifier::UNDERLINED)),
                    _ => Cell::from(value),
                }
            };
            Row::new(vec![
                cell(ProductColumn::Description, product.description.clone()),
                cell(ProductColumn::Quantity, product.quantity.to_string()),
                cell(ProductColumn::Unit, product.unit.clone()),
                cell(ProductColumn::Price, format!("{:.2}", product.price)),
                Cell::from(format!("{:.2}", product.net_value())),
            ])
        })
        .collect();

    let focused = state.focus == DetailsField::Products || state.in_products;
    let title = if rows.is_empty() {
        "Products (none yet, press A to add)"
    } else {
        "Products"
    };
    let widths = [
        Constraint::Percentage(40),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
    ];
    let table = Table::new(rows)
        .header(
            Row::new(vec!["Description", "Quantity", "Unit", "Price", "Value"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(field_block(title, focused, state.in_products))
        .widths(&widths)
        .highlight_style(if state.in_products {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        });

    frame.render_stateful_widget(table, area, &mut state.products_table);
}

fn render_totals<B: Backend>(frame: &mut Frame<B>, state: &InvoiceDetailsState, area: Rect) {
    let totals = state.invoice.totals();
    let currency = &state.invoice.header().currency;
    let lines = vec![
        Spans::from(format!("Subtotal: {:.2} {currency}", totals.subtotal)),
        Spans::from(format!("VAT value: {:.2} {currency}", totals.vat_value)),
        Spans::from(Span::styled(
            format!("Total: {:.2} {currency}", totals.total),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_notice<B: Backend>(frame: &mut Frame<B>, size: Rect, notice: &Notice) {
    let popup_area = centered_rect(60, 20, size);
    let (title, color) = match notice.level {
        NoticeLevel::Error => ("Error", Color::Red),
        NoticeLevel::Warning => ("Warning", Color::Yellow),
    };

    let message = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(notice.message.as_str()),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .block(Block::default().title(title).borders(Borders::ALL))
    .style(Style::default().fg(color));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(message, popup_area);
}

// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

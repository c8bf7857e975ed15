// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use daybook_api::Client;
use daybook_app::{
    Bill, BillState, BillTotals, Diary, DiaryState, DiaryView, FieldName, GridCommand,
    GridController, Interest, InterestState, ModuleKind, Note, NoteScope, NoteState, Patch,
    Record, SortDirection, Sport, SportState, ViewState, coerce, date_to_int,
    interest_category_label, parse_month,
};
use daybook_sync::{
    AutoSaver, BlurOutcome, CellEdit, EditorKind, SavePolicy, SaveStatus, StateStore, SyncDriver,
    SyncEvent,
};
use std::io::Write;
use std::time::{Duration, Instant};
use time::Date;
use time::macros::format_description;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `DAYBOOK_LOG` takes `EnvFilter`
/// directives; the default only shows warnings.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env("DAYBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

/// View adjustments given on the command line. Each applies to one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOverrides {
    pub month: Option<String>,
    pub date: Option<String>,
    pub scope: Option<NoteScope>,
    pub category: Option<i64>,
}

impl ViewOverrides {
    fn only(&self, module: ModuleKind, allowed: &[&str]) -> Result<()> {
        let given = [
            ("--month", self.month.is_some()),
            ("--date", self.date.is_some()),
            ("--scope", self.scope.is_some()),
            ("--category", self.category.is_some()),
        ];
        for (flag, present) in given {
            if present && !allowed.contains(&flag) {
                bail!("{flag} does not apply to {}", module.as_str());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub view: ViewOverrides,
    pub filter: Option<String>,
    pub sort: Option<(String, SortDirection)>,
}

/// One `field=value` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub field: String,
    pub value: String,
}

impl Assignment {
    pub fn parse(raw: &str) -> Result<Self> {
        let (field, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got {raw:?}"))?;
        let field = field.trim();
        if field.is_empty() {
            bail!("missing field name in {raw:?}");
        }
        Ok(Self {
            field: field.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// View state of one module, tied to the record type it lists.
trait ModuleState: ViewState {
    type Record: Record;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()>;

    /// Point the view at `id` so the list fetch includes it.
    fn focus(&mut self, _id: <Self::Record as Record>::Id) {}

    fn scope(&self) -> Option<NoteScope> {
        None
    }

    fn footer(_rows: &[&Self::Record]) -> Option<String> {
        None
    }
}

impl ModuleState for DiaryState {
    type Record = Diary;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()> {
        overrides.only(ModuleKind::Diary, &["--month", "--date"])?;
        if let Some(month) = &overrides.month {
            let (year, month) = parse_month(month)?;
            let first = Date::from_calendar_date(year, month, 1)
                .with_context(|| format!("invalid month {year}-{:02}", u8::from(month)))?;
            self.date = date_to_int(first);
            self.view = DiaryView::Monthly;
        }
        if let Some(raw) = &overrides.date {
            let day = Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
                .with_context(|| format!("date {raw:?} should look like 2026-03-14"))?;
            self.date = date_to_int(day);
            self.view = DiaryView::Daily;
        }
        Ok(())
    }

    fn focus(&mut self, id: <Diary as Record>::Id) {
        self.date = id.get();
    }
}

impl ModuleState for BillState {
    type Record = Bill;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()> {
        overrides.only(ModuleKind::Bill, &["--month"])?;
        if let Some(month) = &overrides.month {
            self.set_month(month)?;
        }
        Ok(())
    }

    fn footer(rows: &[&Bill]) -> Option<String> {
        let totals = BillTotals::from_rows(rows.iter().copied());
        Some(format!(
            "income {:.2}\texpense {:.2}\tnet {:.2}",
            totals.income, totals.expense, totals.net
        ))
    }
}

impl ModuleState for InterestState {
    type Record = Interest;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()> {
        overrides.only(ModuleKind::Interest, &["--category"])?;
        if let Some(category) = overrides.category {
            self.sort = category;
        }
        Ok(())
    }
}

impl ModuleState for NoteState {
    type Record = Note;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()> {
        overrides.only(ModuleKind::Note, &["--scope"])?;
        if let Some(scope) = overrides.scope {
            self.flag = scope.flag();
        }
        Ok(())
    }

    fn scope(&self) -> Option<NoteScope> {
        Some(NoteState::scope(self))
    }
}

impl ModuleState for SportState {
    type Record = Sport;

    fn adjust(&mut self, overrides: &ViewOverrides) -> Result<()> {
        overrides.only(ModuleKind::Sport, &[])
    }
}

/// Runs `$body` with `$state` bound to the view state type of `$module`.
macro_rules! with_state {
    ($module:expr, $state:ident => $body:expr) => {
        match $module {
            ModuleKind::Diary => {
                type $state = DiaryState;
                $body
            }
            ModuleKind::Bill => {
                type $state = BillState;
                $body
            }
            ModuleKind::Interest => {
                type $state = InterestState;
                $body
            }
            ModuleKind::Note => {
                type $state = NoteState;
                $body
            }
            ModuleKind::Sport => {
                type $state = SportState;
                $body
            }
        }
    };
}

type IdOf<S> = <<S as ModuleState>::Record as Record>::Id;

/// Command glue between the server client, the autosave engine and the
/// client-local view state.
pub struct Runtime {
    client: Client,
    states: StateStore,
    policy: SavePolicy,
    request_timeout: Duration,
}

impl Runtime {
    pub fn new(client: Client, states: StateStore, policy: SavePolicy) -> Self {
        let request_timeout = client.timeout();
        Self {
            client,
            states,
            policy,
            request_timeout,
        }
    }

    pub fn check(&self) -> Result<()> {
        self.client.ping()
    }

    pub fn list(
        &self,
        module: ModuleKind,
        options: &ListOptions,
        out: &mut impl Write,
    ) -> Result<()> {
        with_state!(module, S => self.list_module::<S>(options, out))
    }

    pub fn edit(
        &self,
        module: ModuleKind,
        raw_id: &str,
        assignments: &[Assignment],
        view: &ViewOverrides,
        out: &mut impl Write,
    ) -> Result<()> {
        with_state!(module, S => self.edit_module::<S>(raw_id, assignments, view, out))
    }

    pub fn add(
        &self,
        module: ModuleKind,
        assignments: &[Assignment],
        out: &mut impl Write,
    ) -> Result<()> {
        with_state!(module, S => self.add_module::<S>(assignments, out))
    }

    pub fn delete(&self, module: ModuleKind, raw_id: &str, out: &mut impl Write) -> Result<()> {
        with_state!(module, S => {
            let id = parse_id::<S>(raw_id)?;
            self.client.delete::<<S as ModuleState>::Record>(id)?;
            writeln!(out, "deleted {} {id}", module.as_str())?;
            Ok(())
        })
    }

    fn list_module<S: ModuleState>(
        &self,
        options: &ListOptions,
        out: &mut impl Write,
    ) -> Result<()> {
        let mut state: S = self.states.load();
        state.adjust(&options.view)?;
        let records: Vec<S::Record> = self.client.list(&state.query())?;

        let mut grid = GridController::<S::Record>::default();
        if let Some(scope) = state.scope() {
            grid.dispatch(GridCommand::SetScope(scope), &records);
        }
        if let Some(filter) = &options.filter {
            grid.dispatch(GridCommand::SetFilter(filter.clone()), &records);
        }
        if let Some((name, direction)) = &options.sort
            && !grid.restore_sort(name, *direction)
        {
            bail!(
                "cannot sort {} by {name:?}; fields are: {}",
                S::MODULE.as_str(),
                field_names::<S::Record>()
            );
        }

        let rows = grid.view(&records);
        write_table(out, &rows)?;
        if let Some(footer) = S::footer(&rows) {
            writeln!(out, "{footer}")?;
        }

        if let Err(error) = self.states.save(&state) {
            warn!(%error, "could not remember the {} view", S::MODULE.as_str());
        }
        Ok(())
    }

    fn edit_module<S: ModuleState>(
        &self,
        raw_id: &str,
        assignments: &[Assignment],
        view: &ViewOverrides,
        out: &mut impl Write,
    ) -> Result<()> {
        let module = S::MODULE.as_str();
        let id = parse_id::<S>(raw_id)?;
        let mut state: S = self.states.load();
        state.adjust(view)?;
        state.focus(id);

        let records: Vec<S::Record> = self.client.list(&state.query())?;
        let mut saver = AutoSaver::with_records(self.policy, records);
        if S::MODULE == ModuleKind::Diary {
            saver.ensure_record(id);
        }
        if saver.store().get(id).is_none() {
            bail!("no {module} record {id} in the current view; pick the right range (for example --month)");
        }

        let now = Instant::now();
        for assignment in assignments {
            let field = parse_field::<S::Record>(&assignment.field)?;
            match saver.blur(id, field, &assignment.value, now) {
                Some(BlurOutcome::Keep(_)) => {}
                Some(BlurOutcome::Exempt) => {
                    saver.edit_cell(
                        &CellEdit {
                            row_id: raw_id.trim(),
                            field: field.name(),
                            raw: &assignment.value,
                            editor: EditorKind::Input,
                        },
                        now,
                    )?;
                }
                Some(BlurOutcome::Revert(previous)) => bail!(
                    "{module}.{} cannot be {:?}; it stays {previous}",
                    field.name(),
                    assignment.value
                ),
                None => bail!("{module} record {id} disappeared while editing"),
            }
        }

        if saver.pending_ids().is_empty() {
            writeln!(out, "{module} {id} already has these values")?;
            return Ok(());
        }

        let mut driver = SyncDriver::new(saver, self.client.clone());
        driver.flush(Instant::now());
        let events = driver.run_until_idle(self.save_wait())?;
        for event in &events {
            match event {
                SyncEvent::Failed {
                    attempts, error, ..
                } => warn!(module, %id, attempts, %error, "save attempt failed"),
                SyncEvent::Saved { .. } => info!(module, %id, "saved"),
                SyncEvent::SessionExpired { .. } | SyncEvent::Stale { .. } => {}
            }
        }

        if driver.saver().session_expired() {
            bail!(
                "session expired while saving {module} {id}; log in again and update server.session_token"
            );
        }
        match driver.saver().status(id) {
            SaveStatus::Clean => {
                writeln!(out, "saved {module} {id}")?;
                Ok(())
            }
            SaveStatus::Failed {
                attempts,
                last_error,
                ..
            } => bail!("saving {module} {id} failed after {attempts} attempt(s): {last_error}"),
            SaveStatus::Pending | SaveStatus::Saving => {
                bail!("saving {module} {id} did not finish; check the server connection")
            }
        }
    }

    fn add_module<S: ModuleState>(
        &self,
        assignments: &[Assignment],
        out: &mut impl Write,
    ) -> Result<()> {
        let mut patch = <S::Record as Record>::Patch::default();
        for assignment in assignments {
            let field = parse_field::<S::Record>(&assignment.field)?;
            let value = coerce(&assignment.value, field.kind()).with_context(|| {
                format!("{}.{} = {:?}", S::MODULE.as_str(), field.name(), assignment.value)
            })?;
            patch.set(field, value)?;
        }
        let mut record = S::Record::blank(IdOf::<S>::from(0_i64));
        patch.apply_to(&mut record);
        self.client.add(&record)?;
        writeln!(out, "added {} record", S::MODULE.as_str())?;
        Ok(())
    }

    /// Long enough for every retry the policy allows.
    fn save_wait(&self) -> Duration {
        let attempts = self.policy.max_retries.saturating_add(1);
        self.policy.delay + (self.request_timeout + self.policy.retry_max) * attempts
    }
}

fn parse_id<S: ModuleState>(raw: &str) -> Result<IdOf<S>> {
    raw.trim()
        .parse::<IdOf<S>>()
        .map_err(|_| anyhow!("invalid {} id {raw:?}", S::MODULE.as_str()))
}

fn parse_field<R: Record>(name: &str) -> Result<R::Field> {
    R::Field::parse(name).ok_or_else(|| {
        anyhow!(
            "{} has no field {name:?}; fields are: {}",
            R::MODULE.as_str(),
            field_names::<R>()
        )
    })
}

fn field_names<R: Record>() -> String {
    R::Field::ALL
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_table<R: Record>(out: &mut impl Write, rows: &[&R]) -> Result<()> {
    let mut header = vec!["id"];
    header.extend(R::Field::ALL.iter().map(|field| field.name()));
    writeln!(out, "{}", header.join("\t"))?;
    for row in rows {
        let mut cells = vec![row.id().to_string()];
        cells.extend(
            R::Field::ALL
                .iter()
                .map(|field| cell_text::<R>(*field, &row.value(*field).display())),
        );
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

fn cell_text<R: Record>(field: R::Field, text: &str) -> String {
    if R::MODULE == ModuleKind::Interest && field.name() == "sort" {
        let label = text
            .parse::<i64>()
            .map_or("Others", interest_category_label);
        return label.to_owned();
    }
    text.replace('\n', "\\n").replace('\t', " ")
}

#[cfg(test)]
mod tests {
    use super::{Assignment, ListOptions, Runtime, ViewOverrides};
    use anyhow::{Result, anyhow};
    use daybook_api::Client;
    use daybook_app::{Bill, BillId, BillState, ModuleKind, NoteScope, SortDirection};
    use daybook_sync::{SavePolicy, StateStore};
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn bill(id: i64, amount: f64, item: &str) -> Bill {
        Bill {
            id: BillId::new(id),
            date: 20260305,
            inout: -1,
            category: "food".to_owned(),
            amount,
            item: item.to_owned(),
        }
    }

    fn json(body: String) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body).with_header(
            Header::from_bytes("Content-Type", "application/json").expect("valid header"),
        )
    }

    fn runtime(addr: &str, state_path: &std::path::Path) -> Result<Runtime> {
        let client = Client::new(addr, Some("token"), Duration::from_secs(2))?;
        let policy = SavePolicy {
            delay: Duration::from_millis(5),
            retry_base: Duration::from_millis(5),
            retry_max: Duration::from_millis(20),
            max_retries: 2,
        };
        Ok(Runtime::new(client, StateStore::new(state_path), policy))
    }

    #[test]
    fn assignments_split_on_the_first_equals_sign() -> Result<()> {
        let parsed = Assignment::parse("item=a=b")?;
        assert_eq!(parsed.field, "item");
        assert_eq!(parsed.value, "a=b");
        assert!(Assignment::parse("noequals").is_err());
        assert!(Assignment::parse("=5").is_err());
        Ok(())
    }

    #[test]
    fn overrides_for_other_modules_are_rejected() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let runtime = runtime("http://127.0.0.1:1", &temp.path().join("state.json"))?;
        let options = ListOptions {
            view: ViewOverrides {
                scope: Some(NoteScope::Done),
                ..ViewOverrides::default()
            },
            ..ListOptions::default()
        };
        let error = runtime
            .list(ModuleKind::Sport, &options, &mut Vec::new())
            .expect_err("scope should not apply to sport");
        assert!(error.to_string().contains("--scope does not apply to sport"));
        Ok(())
    }

    #[test]
    fn list_filters_sorts_and_remembers_the_month() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let state_path = temp.path().join("state.json");
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let payload = serde_json::to_string(&vec![
            bill(1, 7.0, "lunch"),
            bill(2, 3.0, "coffee"),
            bill(3, 5.0, "bus"),
        ])?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/api/bill/list?start=20260301&end=20260331");
            request.respond(json(payload)).expect("response should succeed");
        });

        let runtime = runtime(&addr, &state_path)?;
        let options = ListOptions {
            view: ViewOverrides {
                month: Some("2026-03".to_owned()),
                ..ViewOverrides::default()
            },
            filter: Some("<5".to_owned()),
            sort: Some(("amount".to_owned(), SortDirection::Desc)),
        };
        let mut out = Vec::new();
        runtime.list(ModuleKind::Bill, &options, &mut out)?;
        handle.join().map_err(|_| anyhow!("server thread panicked"))?;

        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id\tdate\tinout\ttype\tamount\titem");
        assert_eq!(lines[1], "3\t20260305\t-1\tfood\t5\tbus");
        assert_eq!(lines[2], "2\t20260305\t-1\tfood\t3\tcoffee");
        assert!(lines[3].starts_with("income 0.00"));

        let remembered: BillState = StateStore::new(&state_path).load();
        assert_eq!(remembered.start, 20260301);
        assert_eq!(remembered.end, 20260331);
        Ok(())
    }

    #[test]
    fn edit_saves_only_the_changed_field() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let state_path = temp.path().join("state.json");
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let payload = serde_json::to_string(&vec![bill(4, 10.0, "lunch")])?;
        let handle = thread::spawn(move || {
            let list = server.recv().expect("list request expected");
            list.respond(json(payload)).expect("response should succeed");

            let mut update = server.recv().expect("update request expected");
            assert_eq!(update.url(), "/api/bill/update");
            let mut body = String::new();
            update
                .as_reader()
                .read_to_string(&mut body)
                .expect("body should read");
            let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
            assert_eq!(parsed, serde_json::json!({"id": 4, "amount": 12.0}));
            update
                .respond(json(r#"{"status":"ok"}"#.to_owned()))
                .expect("response should succeed");
        });

        let runtime = runtime(&addr, &state_path)?;
        let view = ViewOverrides {
            month: Some("2026-03".to_owned()),
            ..ViewOverrides::default()
        };
        let assignments = vec![
            Assignment::parse("amount=12")?,
            Assignment::parse("item=lunch")?,
        ];
        let mut out = Vec::new();
        runtime.edit(ModuleKind::Bill, "4", &assignments, &view, &mut out)?;
        handle.join().map_err(|_| anyhow!("server thread panicked"))?;
        assert_eq!(String::from_utf8(out)?, "saved bill 4\n");
        Ok(())
    }

    #[test]
    fn edit_refuses_text_that_is_not_a_number() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let payload = serde_json::to_string(&vec![bill(4, 10.0, "lunch")])?;
        let handle = thread::spawn(move || {
            let list = server.recv().expect("list request expected");
            list.respond(json(payload)).expect("response should succeed");
        });

        let runtime = runtime(&addr, &temp.path().join("state.json"))?;
        let view = ViewOverrides {
            month: Some("2026-03".to_owned()),
            ..ViewOverrides::default()
        };
        let error = runtime
            .edit(
                ModuleKind::Bill,
                "4",
                &[Assignment::parse("amount=12a")?],
                &view,
                &mut Vec::new(),
            )
            .expect_err("bad number should be refused");
        handle.join().map_err(|_| anyhow!("server thread panicked"))?;
        assert!(error.to_string().contains("it stays 10"));
        Ok(())
    }
}

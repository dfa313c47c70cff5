// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::Backend;
use crate::backend::CreateOutcome;
use crate::backend::View;
use crate::backend::endpoint::Endpoint;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::replication::ReplicationCheckReport;
use crate::replication::ReplicationOutcome;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::records::AbsenceRecord;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;
use crate::types::records::CourseId;
use crate::types::records::FreeRoomQuery;
use crate::types::records::HourSlot;
use crate::types::records::NewAssignment;
use crate::types::records::Period;
use crate::types::records::Room;
use crate::types::records::RosterEntry;
use crate::types::records::SchoolYearId;
use crate::types::records::TeacherId;

const CSRF_HEADER: &str = "X-CSRFToken";

/// The anti-forgery token sent with mutating requests. Where it comes from
/// is the session's business; we only pass it along.
#[derive(Clone, Default)]
pub struct Credentials {
    csrf_token: Option<String>,
}

impl Credentials {
    pub fn new(csrf_token: Option<String>) -> Self {
        Self { csrf_token }
    }
}

/// A `Backend` that talks JSON over HTTP.
pub struct HttpBackend {
    client: Client,
    base: Url,
    credentials: Credentials,
}

impl HttpBackend {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Fallible<Self> {
        // `Url::join` replaces the last path segment unless it ends in a slash.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&base_url)
            .map_err(|e| ErrorReport::new(format!("invalid base URL {base_url:?}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint<'_>,
        payload: Option<Payload>,
    ) -> Fallible<(StatusCode, Vec<u8>)> {
        let url = endpoint.url(&self.base)?;
        log::debug!("{method} {url}");
        let mutating = method != Method::GET;
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if mutating {
            if let Some(token) = &self.credentials.csrf_token {
                request = request.header(CSRF_HEADER, token);
            }
        }
        match payload {
            Some(Payload::Json(body)) => {
                request = request.header(CONTENT_TYPE, "application/json").body(body);
            }
            Some(Payload::Form(fields)) => {
                request = request.form(&fields);
            }
            None => {}
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        Ok((status, bytes.to_vec()))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Fallible<T> {
        let (status, bytes) = self.send(Method::GET, &endpoint, None).await?;
        if !status.is_success() {
            return Err(unexpected(&endpoint, status));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &Endpoint<'_>,
        body: &B,
    ) -> Fallible<(StatusCode, Vec<u8>)> {
        let body = serde_json::to_vec(body)?;
        self.send(Method::POST, endpoint, Some(Payload::Json(body))).await
    }

    /// Post the assignment ids the replication views read, as the
    /// repeated form field `assignments[]`.
    async fn post_assignment_ids(
        &self,
        endpoint: &Endpoint<'_>,
        ids: &[AssignmentId],
    ) -> Fallible<(StatusCode, Vec<u8>)> {
        let fields = ids
            .iter()
            .map(|id| ("assignments[]", id.to_string()))
            .collect();
        self.send(Method::POST, endpoint, Some(Payload::Form(fields)))
            .await
    }
}

/// A request body.
enum Payload {
    Json(Vec<u8>),
    Form(Vec<(&'static str, String)>),
}

fn unexpected(endpoint: &Endpoint<'_>, status: StatusCode) -> ErrorReport {
    ErrorReport::transport(format!("{endpoint} answered {status}."))
}

/// Flatten a validation payload (strings, lists, or field maps) into
/// readable messages.
fn rejection_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(rejection_messages).collect(),
        Value::Object(fields) => fields
            .iter()
            .flat_map(|(field, value)| {
                rejection_messages(value)
                    .into_iter()
                    .map(move |msg| match field.as_str() {
                        "non_field_errors" | "detail" => msg,
                        _ => format!("{field}: {msg}"),
                    })
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

#[derive(Deserialize)]
struct RejectedDate {
    date: Date,
}

impl Backend for HttpBackend {
    async fn hour_slots(&self, year: SchoolYearId) -> Fallible<Vec<HourSlot>> {
        self.get(Endpoint::HourSlots { year }).await
    }

    async fn roster(&self, year: SchoolYearId, course: CourseId) -> Fallible<Vec<RosterEntry>> {
        self.get(Endpoint::Roster { year, course }).await
    }

    async fn assignments(
        &self,
        year: SchoolYearId,
        view: View,
        range: DateRange,
    ) -> Fallible<Vec<AssignmentRecord>> {
        let endpoint = match view {
            View::Course(course) => Endpoint::CourseAssignments {
                year,
                course,
                range,
            },
            View::Teacher(teacher) => Endpoint::TeacherAssignments {
                year,
                teacher,
                range,
            },
            View::Room(room) => Endpoint::RoomAssignments { year, room, range },
        };
        self.get(endpoint).await
    }

    async fn teacher_absences(
        &self,
        year: SchoolYearId,
        teacher: TeacherId,
        range: DateRange,
    ) -> Fallible<Vec<AbsenceRecord>> {
        self.get(Endpoint::TeacherAbsences {
            year,
            teacher,
            range,
        })
        .await
    }

    async fn holidays(&self, year: SchoolYearId, range: DateRange) -> Fallible<Vec<Period>> {
        self.get(Endpoint::Holidays { year, range }).await
    }

    async fn internships(
        &self,
        year: SchoolYearId,
        course: CourseId,
        range: DateRange,
    ) -> Fallible<Vec<Period>> {
        self.get(Endpoint::Internships {
            year,
            course,
            range,
        })
        .await
    }

    async fn free_rooms(&self, query: &FreeRoomQuery) -> Fallible<Vec<Room>> {
        self.get(Endpoint::FreeRooms(query)).await
    }

    async fn create_assignment(&self, assignment: &NewAssignment) -> Fallible<CreateOutcome> {
        let endpoint = Endpoint::CreateAssignment;
        let (status, bytes) = self.post(&endpoint, assignment).await?;
        if status.is_success() {
            let record: AssignmentRecord = serde_json::from_slice(&bytes)?;
            Ok(CreateOutcome::Created(record))
        } else if status == StatusCode::BAD_REQUEST {
            let payload: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            Ok(CreateOutcome::Rejected(rejection_messages(&payload)))
        } else {
            Err(unexpected(&endpoint, status))
        }
    }

    async fn delete_assignment(&self, id: AssignmentId, range: DateRange) -> Fallible<()> {
        let endpoint = Endpoint::DeleteAssignment { id, range };
        let (status, _) = self.send(Method::DELETE, &endpoint, None).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(unexpected(&endpoint, status))
        }
    }

    async fn check_replication(
        &self,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationCheckReport> {
        let endpoint = Endpoint::CheckReplication { target };
        let (status, bytes) = self.post_assignment_ids(&endpoint, ids).await?;
        if !status.is_success() {
            return Err(unexpected(&endpoint, status));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn replicate_week(
        &self,
        year: SchoolYearId,
        course: CourseId,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationOutcome> {
        let endpoint = Endpoint::ReplicateWeek {
            year,
            course,
            target,
        };
        let (status, bytes) = self.post_assignment_ids(&endpoint, ids).await?;
        if status.is_success() {
            Ok(ReplicationOutcome::Replicated)
        } else if status == StatusCode::BAD_REQUEST {
            let rejected: Vec<RejectedDate> = serde_json::from_slice(&bytes)?;
            Ok(ReplicationOutcome::Rejected {
                dates: rejected.into_iter().map(|r| r.date).collect(),
            })
        } else {
            Err(unexpected(&endpoint, status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;

    use axum::Form;
    use axum::Json;
    use axum::Router;
    use axum::extract::Path;
    use axum::extract::Query;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::delete;
    use axum::routing::get;
    use axum::routing::post;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::net::TcpStream;
    use tokio::spawn;
    use tokio::time::sleep;

    use super::*;
    use crate::session::Timetable;
    use crate::types::block::BlockId;
    use crate::types::time::TimeOfDay;

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl Recorded {
        fn push(&self, line: String) {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(line);
            }
        }

        fn all(&self) -> Vec<String> {
            match self.requests.lock() {
                Ok(requests) => requests.clone(),
                Err(_) => Vec::new(),
            }
        }
    }

    fn assignment_json(id: u64, date: &str, hour_slot: Option<u64>, start: &str, end: &str) -> Value {
        json!({
            "id": id,
            "date": date,
            "hour_slot": hour_slot,
            "hour_start": start,
            "hour_end": end,
            "teacher": {"id": 3, "first_name": "Ada", "last_name": "Byron"},
            "subject": {"id": 7, "name": "Maths"},
            "room": null,
            "course": {"id": 1, "year": 1, "section": "A"},
            "bes": false,
            "absent": false,
            "substitution": false,
            "co_teaching": false
        })
    }

    async fn hour_slots(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(query.get("school_year").map(String::as_str), Some("3"));
        Json(json!([
            {"id": 1, "hour_number": 1, "day_of_week": 0, "starts_at": "08:00:00", "ends_at": "09:00:00"},
            {"id": 2, "hour_number": 2, "day_of_week": 0, "starts_at": "09:00:00", "ends_at": "10:00:00"}
        ]))
    }

    async fn assignments(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(query.get("from_date").map(String::as_str), Some("2020-05-04"));
        assert_eq!(query.get("to_date").map(String::as_str), Some("2020-05-10"));
        Json(json!([
            assignment_json(10, "2020-05-04", Some(1), "08:00:00", "09:00:00"),
            assignment_json(11, "2020-05-06", None, "14:30:00", "15:30:00")
        ]))
    }

    async fn create(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (axum::http::StatusCode, Json<Value>) {
        let token = headers
            .get("x-csrftoken")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        recorded.push(format!("create token={token}"));
        if body["hour_start"] == "13:00" {
            return (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({"non_field_errors": ["Teacher already busy."], "room_id": ["Room taken."]})),
            );
        }
        (
            axum::http::StatusCode::CREATED,
            Json(assignment_json(99, "2020-05-04", Some(2), "09:00:00", "10:00:00")),
        )
    }

    async fn remove(
        State(recorded): State<Recorded>,
        Path(id): Path<u64>,
        Query(query): Query<HashMap<String, String>>,
    ) -> axum::http::StatusCode {
        recorded.push(format!(
            "delete {id} from={}",
            query.get("from_date").cloned().unwrap_or_default()
        ));
        axum::http::StatusCode::NO_CONTENT
    }

    fn assignment_ids(fields: &[(String, String)]) -> Vec<String> {
        fields
            .iter()
            .filter(|(key, _)| key == "assignments[]")
            .map(|(_, value)| value.clone())
            .collect()
    }

    async fn check(
        Path((from, to)): Path<(String, String)>,
        Form(fields): Form<Vec<(String, String)>>,
    ) -> Json<Value> {
        assert_eq!(from, "2020-05-11");
        assert_eq!(to, "2020-05-24");
        assert_eq!(assignment_ids(&fields), vec!["10", "11"]);
        Json(json!({
            "teacher_conflicts": [],
            "course_conflicts": [],
            "room_conflicts": [assignment_json(50, "2020-05-13", None, "14:30:00", "15:30:00")]
        }))
    }

    async fn replicate(
        State(recorded): State<Recorded>,
        Path((year, course, from, to)): Path<(u64, u64, String, String)>,
        Form(fields): Form<Vec<(String, String)>>,
    ) -> (axum::http::StatusCode, Json<Value>) {
        recorded.push(format!(
            "replicate {year} {course} {from} {to} {}",
            assignment_ids(&fields).join(",")
        ));
        (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!([{"date": "2020-05-13"}, {"date": "2020-05-20"}])),
        )
    }

    async fn broken() -> axum::http::StatusCode {
        axum::http::StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn empty() -> Json<Value> {
        Json(json!([]))
    }

    /// Start a fake backend on a free port and return its base URL.
    async fn start_fake_server(recorded: Recorded) -> Fallible<String> {
        let port = match portpicker::pick_unused_port() {
            Some(port) => port,
            None => return crate::error::fail("no free port."),
        };
        let bind = format!("127.0.0.1:{port}");
        let app = Router::new()
            .route("/timetable/api/hour_slots/", get(hour_slots))
            .route("/timetable/api/assignments/", get(assignments).post(create))
            .route("/timetable/api/assignments/{id}/", delete(remove))
            .route("/timetable/api/holidays/", get(empty))
            .route("/timetable/api/stages/", get(empty))
            .route("/timetable/api/rooms/", get(broken))
            .route(
                "/timetable/check_week_replication/{from}/{to}",
                post(check),
            )
            .route(
                "/timetable/replicate_week/add/{year}/{course}/{from}/{to}",
                post(replicate),
            )
            .with_state(recorded);
        let listener = TcpListener::bind(&bind).await?;
        spawn(async move { axum::serve(listener, app).await });
        loop {
            if let Ok(stream) = TcpStream::connect(&bind).await {
                drop(stream);
                break;
            }
            sleep(Duration::from_millis(1)).await;
        }
        Ok(format!("http://{bind}/timetable"))
    }

    fn backend(base: &str) -> Fallible<HttpBackend> {
        HttpBackend::new(
            base,
            Credentials::new(Some("tok".to_string())),
            Duration::from_secs(5),
        )
    }

    fn week() -> DateRange {
        DateRange::week(Date::ymd(2020, 5, 4))
    }

    #[test]
    fn test_rejection_messages() {
        let payload = json!({"non_field_errors": ["clash"], "room_id": ["taken", "closed"]});
        let mut messages = rejection_messages(&payload);
        messages.sort();
        assert_eq!(messages, vec!["clash", "room_id: closed", "room_id: taken"]);
        assert!(rejection_messages(&Value::Null).is_empty());
    }

    #[tokio::test]
    async fn test_load_week_over_http() -> Fallible<()> {
        let base = start_fake_server(Recorded::default()).await?;
        let mut timetable = Timetable::new(backend(&base)?, 3, View::Course(1), Date::ymd(2020, 5, 6));
        timetable.load_week(Date::ymd(2020, 5, 6)).await?;
        let grid = timetable.grid();
        assert_eq!(grid.len(), 3);
        let extra = BlockId::Extra {
            day: 2,
            start: TimeOfDay::new(14, 30)?,
            end: TimeOfDay::new(15, 30)?,
        };
        assert_eq!(grid.block(&extra).map(|b| b.events().len()), Some(1));
        assert_eq!(grid.event_ids(), vec![10, 11]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_sends_token_and_maps_rejection() -> Fallible<()> {
        let recorded = Recorded::default();
        let base = start_fake_server(recorded.clone()).await?;
        let backend = backend(&base)?;
        let mut new = NewAssignment {
            teacher_id: 3,
            course_id: 1,
            subject_id: 7,
            school_year: 3,
            school: 1,
            date: Date::ymd(2020, 5, 4),
            hour_start: TimeOfDay::new(9, 0)?,
            hour_end: TimeOfDay::new(10, 0)?,
            bes: false,
            co_teaching: false,
            substitution: false,
            absent: false,
            room_id: None,
        };
        match backend.create_assignment(&new).await? {
            CreateOutcome::Created(record) => assert_eq!(record.id, 99),
            other => panic!("unexpected outcome: {other:?}"),
        }
        new.hour_start = TimeOfDay::new(13, 0)?;
        match backend.create_assignment(&new).await? {
            CreateOutcome::Rejected(mut messages) => {
                messages.sort();
                assert_eq!(messages, vec!["Teacher already busy.", "room_id: Room taken."]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(recorded.all(), vec!["create token=tok", "create token=tok"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_is_scoped_by_week() -> Fallible<()> {
        let recorded = Recorded::default();
        let base = start_fake_server(recorded.clone()).await?;
        backend(&base)?.delete_assignment(10, week()).await?;
        assert_eq!(recorded.all(), vec!["delete 10 from=2020-05-04"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_replication_over_http() -> Fallible<()> {
        let recorded = Recorded::default();
        let base = start_fake_server(recorded.clone()).await?;
        let backend = backend(&base)?;
        let target = DateRange::new(Date::ymd(2020, 5, 11), Date::ymd(2020, 5, 24))?;
        let report = backend.check_replication(&[10, 11], target).await?;
        assert_eq!(report.room_conflicts.len(), 1);
        assert!(report.teacher_conflicts.is_empty());
        let outcome = backend.replicate_week(3, 1, &[10, 11], target).await?;
        assert_eq!(
            outcome,
            ReplicationOutcome::Rejected {
                dates: vec![Date::ymd(2020, 5, 13), Date::ymd(2020, 5, 20)]
            }
        );
        // Both views read the ids as the repeated form field.
        assert_eq!(recorded.all(), vec!["replicate 3 1 2020-05-11 2020-05-24 10,11"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() -> Fallible<()> {
        let base = start_fake_server(Recorded::default()).await?;
        let query = FreeRoomQuery {
            school_year: 3,
            school: 1,
            course: 1,
            date: Date::ymd(2020, 5, 4),
            hour_start: TimeOfDay::new(8, 0)?,
            hour_end: TimeOfDay::new(9, 0)?,
        };
        let result = backend(&base)?.free_rooms(&query).await;
        match result {
            Err(e) => assert!(e.is_retryable()),
            Ok(rooms) => panic!("expected an error, got {rooms:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_retryable() -> Fallible<()> {
        let port = match portpicker::pick_unused_port() {
            Some(port) => port,
            None => return crate::error::fail("no free port."),
        };
        let backend = backend(&format!("http://127.0.0.1:{port}/"))?;
        match backend.hour_slots(3).await {
            Err(e) => assert!(e.is_retryable()),
            Ok(slots) => panic!("expected an error, got {slots:?}"),
        }
        Ok(())
    }
}

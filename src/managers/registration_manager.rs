use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Result, WalkError};
use crate::identity::{IdentityError, StudentVerifier};
use crate::models::{Contact, Person, PersonType, Team, TeamRole, WalkStatus, NO_TEAM};
use crate::state::{EventDatabase, SharedEventStore};

/// How the participant was created and joined
const CREATED_OP_REGISTERED: u8 = 2;
const JOIN_OP_UNJOINED: u8 = 5;

const GENDER_MALE: i8 = 1;
const GENDER_FEMALE: i8 = 2;

/// Student registration form
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRegistration {
    pub name: String,
    pub stu_id: String,
    pub password: String,
    /// National identity number
    #[serde(rename = "id")]
    pub identity: String,
    pub campus: u8,
    pub contact: Contact,
}

impl StudentRegistration {
    fn validate(&self) -> Result<()> {
        let required = [
            &self.name,
            &self.stu_id,
            &self.password,
            &self.identity,
            &self.contact.tel,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(WalkError::InvalidParameters);
        }
        Ok(())
    }
}

/// A participant's own record with their team, if any
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub person: Person,
    pub team: Option<Team>,
}

fn map_identity_error(err: IdentityError) -> WalkError {
    match err {
        IdentityError::WrongAccount | IdentityError::WrongPassword => WalkError::WrongCredentials,
        IdentityError::Closed => WalkError::IdentityServiceClosed,
        IdentityError::NotActivated => WalkError::AccountNotActivated,
        IdentityError::Service(message) => {
            error!("Identity service failure: {}", message);
            WalkError::Upstream { message }
        }
    }
}

pub struct RegistrationManager {
    store: SharedEventStore,
    verifier: Arc<dyn StudentVerifier>,
}

impl RegistrationManager {
    pub fn new(store: SharedEventStore, verifier: Arc<dyn StudentVerifier>) -> Self {
        Self { store, verifier }
    }

    fn check_unregistered(
        &self,
        db: &EventDatabase,
        open_id: &str,
        form: &StudentRegistration,
    ) -> Result<()> {
        if db.person(open_id).is_some()
            || db
                .find_registered(&form.identity, &form.contact.tel)
                .is_some()
        {
            warn!("Duplicate registration attempt for {}", open_id);
            return Err(WalkError::AlreadyRegistered);
        }
        Ok(())
    }

    /// Verify a student's school account and create their participant record
    pub async fn register_student(&self, open_id: &str, form: StudentRegistration) -> Result<Person> {
        form.validate()?;

        // Reject duplicates before calling the school
        {
            let db = self.store.read().await;
            self.check_unregistered(&db, open_id, &form)?;
        }

        let info = self
            .verifier
            .verify(&form.stu_id, &form.password)
            .await
            .map_err(map_identity_error)?;

        let mut db = self.store.begin().await;
        // The lock was released during verification
        self.check_unregistered(&db, open_id, &form)?;

        let person = Person {
            open_id: open_id.to_string(),
            name: form.name,
            gender: if info.gender == "male" {
                GENDER_MALE
            } else {
                GENDER_FEMALE
            },
            stu_id: form.stu_id,
            campus: form.campus,
            identity: form.identity,
            status: TeamRole::Unassigned,
            qq: form.contact.qq,
            wechat: form.contact.wechat,
            college: info.college,
            tel: form.contact.tel,
            created_op: CREATED_OP_REGISTERED,
            join_op: JOIN_OP_UNJOINED,
            team_id: NO_TEAM,
            walk_status: WalkStatus::NotStarted,
            person_type: PersonType::Student,
        };
        db.insert_person(person.clone());
        db.commit().await?;

        info!("Registered student {} ({})", person.name, person.open_id);
        Ok(person)
    }

    pub async fn user_info(&self, open_id: &str) -> Result<UserInfo> {
        let db = self.store.read().await;
        let person = db.person(open_id).ok_or(WalkError::UserNotFound)?;
        Ok(UserInfo {
            team: db.team_of(person).cloned(),
            person: person.clone(),
        })
    }
}

pub type SharedRegistrationManager = Arc<RegistrationManager>;

pub fn create_shared_registration_manager(
    store: SharedEventStore,
    verifier: Arc<dyn StudentVerifier>,
) -> SharedRegistrationManager {
    Arc::new(RegistrationManager::new(store, verifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StudentInfo;
    use crate::managers::fixtures::{person, seeded_store, team};
    use crate::models::{Route, TeamStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Verifier answering every request with the same outcome
    struct FakeVerifier {
        outcome: fn() -> std::result::Result<StudentInfo, IdentityError>,
        calls: AtomicUsize,
    }

    impl FakeVerifier {
        fn new(outcome: fn() -> std::result::Result<StudentInfo, IdentityError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StudentVerifier for FakeVerifier {
        async fn verify(
            &self,
            _stu_id: &str,
            _password: &str,
        ) -> std::result::Result<StudentInfo, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn female_student() -> std::result::Result<StudentInfo, IdentityError> {
        Ok(StudentInfo {
            gender: "female".to_string(),
            college: "Chemistry".to_string(),
        })
    }

    fn form(identity: &str, tel: &str) -> StudentRegistration {
        StudentRegistration {
            name: "Lin".to_string(),
            stu_id: "302019".to_string(),
            password: "secret".to_string(),
            identity: identity.to_string(),
            campus: 2,
            contact: Contact {
                qq: "10001".to_string(),
                wechat: String::new(),
                tel: tel.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_register_creates_participant() {
        let store = seeded_store(|_| {});
        let verifier = FakeVerifier::new(female_student);
        let manager = RegistrationManager::new(store.clone(), verifier.clone());

        let created = manager
            .register_student("open-1", form("330100", "13800000000"))
            .await
            .unwrap();

        assert_eq!(created.gender, GENDER_FEMALE);
        assert_eq!(created.college, "Chemistry");
        assert_eq!(created.team_id, NO_TEAM);
        assert_eq!(created.status, TeamRole::Unassigned);
        assert_eq!(created.created_op, 2);
        assert_eq!(created.join_op, 5);
        assert_eq!(created.person_type, PersonType::Student);
        assert!(store.read().await.person("open-1").is_some());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_skips_verifier() {
        let store = seeded_store(|db| {
            let mut existing = person("a", 0, WalkStatus::NotStarted);
            existing.team_id = NO_TEAM;
            db.insert_person(existing);
        });
        let verifier = FakeVerifier::new(female_student);
        let manager = RegistrationManager::new(store, verifier.clone());

        for (open_id, identity, tel) in [
            ("a", "new-id", "new-tel"),
            ("b", "id-a", "new-tel"),
            ("c", "new-id", "tel-a"),
        ] {
            let err = manager
                .register_student(open_id, form(identity, tel))
                .await
                .unwrap_err();
            assert!(matches!(err, WalkError::AlreadyRegistered));
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identity_errors_are_mapped() {
        fn wrong_password() -> std::result::Result<StudentInfo, IdentityError> {
            Err(IdentityError::WrongPassword)
        }
        fn closed() -> std::result::Result<StudentInfo, IdentityError> {
            Err(IdentityError::Closed)
        }
        fn inactive() -> std::result::Result<StudentInfo, IdentityError> {
            Err(IdentityError::NotActivated)
        }
        fn broken() -> std::result::Result<StudentInfo, IdentityError> {
            Err(IdentityError::Service("timeout".to_string()))
        }

        let store = seeded_store(|_| {});
        let cases: [(fn() -> std::result::Result<StudentInfo, IdentityError>, String); 4] = [
            (wrong_password, WalkError::WrongCredentials.to_string()),
            (closed, WalkError::IdentityServiceClosed.to_string()),
            (inactive, WalkError::AccountNotActivated.to_string()),
            (broken, "System error, please try again later".to_string()),
        ];
        for (outcome, expected) in cases {
            let manager = RegistrationManager::new(store.clone(), FakeVerifier::new(outcome));
            let err = manager
                .register_student("x", form("id-x", "tel-x"))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
        assert!(store.read().await.person("x").is_none());
    }

    #[tokio::test]
    async fn test_missing_tel_is_invalid() {
        let manager = RegistrationManager::new(seeded_store(|_| {}), FakeVerifier::new(female_student));
        let err = manager
            .register_student("x", form("id-x", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::InvalidParameters));
    }

    #[tokio::test]
    async fn test_user_info_includes_team() {
        let store = seeded_store(|db| {
            let id = db.insert_team(team(Route::PfAll, TeamStatus::NotStarted));
            db.insert_person(person("a", id, WalkStatus::NotStarted));
        });
        let manager = RegistrationManager::new(store, FakeVerifier::new(female_student));

        let info = manager.user_info("a").await.unwrap();
        assert_eq!(info.person.open_id, "a");
        assert_eq!(info.team.unwrap().route, Route::PfAll);
        assert!(matches!(
            manager.user_info("ghost").await,
            Err(WalkError::UserNotFound)
        ));
    }
}

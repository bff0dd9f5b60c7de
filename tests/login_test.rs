mod common;

use common::{activate_owner, owner_request, register_verified_staff, TestApp};
use onboarding_service::models::StaffDecision;
use onboarding_service::services::ServiceError;

#[tokio::test]
async fn active_owner_logs_in_and_gets_a_credential() {
    let app = TestApp::new();
    let owner = activate_owner(&app, "amina@rahman.test", "+15550000001").await;

    app.auth
        .request_login_code("amina@rahman.test")
        .await
        .unwrap();
    let code = app.code_sent_to("amina@rahman.test");

    let credential = app
        .auth
        .login("amina@rahman.test", &code)
        .await
        .unwrap();
    assert_eq!(credential.subject_id, owner.id);
    assert_eq!(credential.role, "owner");

    let claims = app.jwt.decode(&credential.token).unwrap();
    assert_eq!(claims.sub, owner.id.to_string());
    assert_eq!(claims.workshop, "Rahman Auto Works");
    assert_eq!(claims.status, "active");
}

#[tokio::test]
async fn approved_staff_credential_carries_the_workshop_name() {
    let app = TestApp::new();
    let owner = activate_owner(&app, "amina@rahman.test", "+15550000001").await;
    let staff = register_verified_staff(&app, owner.id, "jordan@crew.test", "+15550000010").await;
    app.staff
        .decide(
            StaffDecision {
                staff_id: staff.id,
                approve: true,
                reason: None,
            },
            owner.id,
        )
        .await
        .unwrap();

    app.auth
        .request_login_code("jordan@crew.test")
        .await
        .unwrap();
    let code = app.code_sent_to("jordan@crew.test");

    let credential = app.auth.login("jordan@crew.test", &code).await.unwrap();
    assert_eq!(credential.subject_id, staff.id);
    assert_eq!(credential.role, "staff");

    let claims = app.jwt.decode(&credential.token).unwrap();
    assert_eq!(claims.role, "staff");
    assert_eq!(claims.workshop, "Rahman Auto Works");
    assert_eq!(claims.status, "approved");
}

#[tokio::test]
async fn owner_mid_pipeline_cannot_log_in() {
    let app = TestApp::new();
    app.onboarding
        .submit_registration(owner_request("amina@rahman.test", "+15550000001"))
        .await
        .unwrap();

    app.auth
        .request_login_code("amina@rahman.test")
        .await
        .unwrap();
    let code = app.code_sent_to("amina@rahman.test");

    assert!(matches!(
        app.auth.login("amina@rahman.test", &code).await,
        Err(ServiceError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn unapproved_staff_cannot_log_in() {
    let app = TestApp::new();
    let owner = activate_owner(&app, "amina@rahman.test", "+15550000001").await;
    register_verified_staff(&app, owner.id, "jordan@crew.test", "+15550000010").await;

    app.auth
        .request_login_code("jordan@crew.test")
        .await
        .unwrap();
    let code = app.code_sent_to("jordan@crew.test");

    assert!(matches!(
        app.auth.login("jordan@crew.test", &code).await,
        Err(ServiceError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn unknown_contact_is_not_found() {
    let app = TestApp::new();
    assert!(matches!(
        app.auth.request_login_code("nobody@nowhere.test").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        app.auth.login("nobody@nowhere.test", "123456").await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn login_code_is_single_use() {
    let app = TestApp::new();
    activate_owner(&app, "amina@rahman.test", "+15550000001").await;

    app.auth
        .request_login_code("amina@rahman.test")
        .await
        .unwrap();
    let code = app.code_sent_to("amina@rahman.test");

    app.auth.login("amina@rahman.test", &code).await.unwrap();
    assert!(matches!(
        app.auth.login("amina@rahman.test", &code).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn wrong_login_code_is_rejected() {
    let app = TestApp::new();
    activate_owner(&app, "amina@rahman.test", "+15550000001").await;

    app.auth
        .request_login_code("amina@rahman.test")
        .await
        .unwrap();
    let code = app.code_sent_to("amina@rahman.test");
    let wrong = if code == "000000" { "999999" } else { "000000" };

    assert!(matches!(
        app.auth.login("amina@rahman.test", wrong).await,
        Err(ServiceError::InvalidCode)
    ));
}

use crate::handlers;
use api_shared::{
    AppointmentRes, AppointmentStatus, CreateAppointmentReq, CreateTreatmentReq,
    DoctorCreateAppointmentReq, ErrorBody, FinanceReviewRes, HealthRes, LoginReq, LoginRes,
    PaginationRes, RefreshReq, ReviewReq, Role, SearchRes, SignupReq, TokensRes,
    TreatmentAddedRes, TreatmentRemovedRes, TreatmentRes, UserRes, UserSummaryRes,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::users::list_doctors,
        handlers::users::profile,
        handlers::appointments::create_for_patient,
        handlers::appointments::create_for_doctor,
        handlers::appointments::list_for_patient,
        handlers::appointments::list_for_doctor,
        handlers::appointments::start,
        handlers::appointments::finish,
        handlers::treatments::add_treatment,
        handlers::treatments::remove_treatment,
        handlers::finance::search,
        handlers::finance::review,
    ),
    components(schemas(
        AppointmentRes,
        AppointmentStatus,
        CreateAppointmentReq,
        CreateTreatmentReq,
        DoctorCreateAppointmentReq,
        ErrorBody,
        FinanceReviewRes,
        HealthRes,
        LoginReq,
        LoginRes,
        PaginationRes,
        RefreshReq,
        ReviewReq,
        Role,
        SearchRes,
        SignupReq,
        TokensRes,
        TreatmentAddedRes,
        TreatmentRemovedRes,
        TreatmentRes,
        UserRes,
        UserSummaryRes,
    )),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "appointments", description = "Booking and the visit lifecycle"),
        (name = "treatments", description = "Billable treatments on a visit"),
        (name = "finance", description = "Search and review"),
    )
)]
pub struct ApiDoc;

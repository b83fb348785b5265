//! Collection layout of the document store.

pub const TUTOR: &str = "tutor";
pub const LEARNER: &str = "learner";

pub const REVIEWS: &str = "all_reviews/allReviews/reviewList";
pub const CENTERS: &str = "all_users/tutor_center/users";

/// The user type a listing shows to `user_type`: learners browse tutors,
/// everyone else browses learners.
pub fn counterpart_type(user_type: &str) -> &'static str {
    if user_type == LEARNER {
        TUTOR
    } else {
        LEARNER
    }
}

pub fn users(user_type: &str) -> String {
    format!("all_users/{user_type}/users")
}

pub fn posts(user_type: &str) -> String {
    format!("createdPosts/createdPost_{user_type}/users")
}

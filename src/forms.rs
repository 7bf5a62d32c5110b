//! Submitted form data and field-level validation.
//!
//! Every form keeps the raw strings it was submitted with so an invalid
//! submission can be rendered back with its messages. Checks that need the
//! database (uniqueness, existence) are passed in by the handler as plain
//! values, which keeps validation itself pure.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use image::ImageFormat;
use serde::Deserialize;

use crate::auth::password::password_problems;
use crate::auth::users::ProfileInput;
use crate::blog::posts::PostInput;
use crate::db::models::{Category, Location, Post, User};

pub const NON_FIELD: &str = "__all__";
pub const TITLE_MAX: usize = 256;
pub const USERNAME_MAX: usize = 150;
pub const REGISTRATION_NAME_MAX: usize = 30;
pub const PROFILE_NAME_MAX: usize = 150;
const REQUIRED: &str = "This field is required.";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// All messages for a field joined into one line.
    pub fn message(&self, field: &str) -> String {
        self.fields
            .get(field)
            .map(|messages| messages.join(" "))
            .unwrap_or_default()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn check_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

fn check_username(errors: &mut FormErrors, username: &str, taken: bool) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
        return;
    }
    check_length(errors, "username", username, USERNAME_MAX);
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    if taken {
        errors.add("username", "A user with that username already exists.");
    }
}

fn check_email(errors: &mut FormErrors, email: &str, required: bool) {
    if email.is_empty() {
        if required {
            errors.add("email", REQUIRED);
        }
        return;
    }
    if !email_address::EmailAddress::is_valid(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn check_new_password(
    errors: &mut FormErrors,
    field1: &str,
    field2: &str,
    password1: &str,
    password2: &str,
    username: &str,
) {
    if password1.is_empty() {
        errors.add(field1, REQUIRED);
    }
    if password2.is_empty() {
        errors.add(field2, REQUIRED);
    }
    if password1.is_empty() || password2.is_empty() {
        return;
    }
    if password1 != password2 {
        errors.add(field2, "The two password fields didn't match.");
        return;
    }
    for problem in password_problems(password2, username) {
        errors.add(field2, problem);
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

impl RegistrationForm {
    /// Returns the new profile and the chosen password.
    pub fn validate(&self, username_taken: bool) -> Result<(ProfileInput, String), FormErrors> {
        let mut errors = FormErrors::default();
        let profile = ProfileInput {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        };

        check_username(&mut errors, &profile.username, username_taken);
        check_email(&mut errors, &profile.email, true);
        check_length(&mut errors, "first_name", &profile.first_name, REGISTRATION_NAME_MAX);
        check_length(&mut errors, "last_name", &profile.last_name, REGISTRATION_NAME_MAX);
        check_new_password(
            &mut errors,
            "password1",
            "password2",
            &self.password1,
            &self.password2,
            &profile.username,
        );

        let password = self.password1.clone();
        errors.into_result((profile, password))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        ProfileForm {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }

    pub fn validate(&self, username_taken: bool) -> Result<ProfileInput, FormErrors> {
        let mut errors = FormErrors::default();
        let profile = ProfileInput {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        };

        check_username(&mut errors, &profile.username, username_taken);
        check_email(&mut errors, &profile.email, false);
        check_length(&mut errors, "first_name", &profile.first_name, PROFILE_NAME_MAX);
        check_length(&mut errors, "last_name", &profile.last_name, PROFILE_NAME_MAX);

        errors.into_result(profile)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    /// Returns the new password.
    pub fn validate(&self, old_password_ok: bool, username: &str) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        if self.old_password.is_empty() {
            errors.add("old_password", REQUIRED);
        } else if !old_password_ok {
            errors.add(
                "old_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
        }
        check_new_password(
            &mut errors,
            "new_password1",
            "new_password2",
            &self.new_password1,
            &self.new_password2,
            username,
        );
        errors.into_result(self.new_password1.clone())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(text)
    }
}

/// A file part from a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Raster format sniffed from the file contents. The client's file name
    /// plays no part.
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }

    /// Stored file extension, taken from the detected format.
    pub fn extension(&self) -> Option<&'static str> {
        self.format()
            .and_then(|format| format.extensions_str().first().copied())
    }

    /// True when the bytes decode as one of the supported raster formats.
    pub fn is_image(&self) -> bool {
        match self.format() {
            Some(format) => image::load_from_memory_with_format(&self.bytes, format).is_ok(),
            None => false,
        }
    }
}

/// Raw fields of the post create/edit form.
#[derive(Debug, Default, Clone)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub is_published: bool,
    pub image_clear: bool,
    /// Image already stored for the post being edited.
    pub current_image: Option<String>,
}

const PUB_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub fn parse_pub_date(raw: &str) -> Option<NaiveDateTime> {
    PUB_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
}

impl PostForm {
    /// Blank form for a new post, published and dated now.
    pub fn new_post(now: NaiveDateTime) -> Self {
        PostForm {
            pub_date: now.format("%Y-%m-%dT%H:%M").to_string(),
            is_published: true,
            ..PostForm::default()
        }
    }

    pub fn from_post(post: &Post) -> Self {
        PostForm {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date_input(),
            category: post
                .category
                .as_ref()
                .map(|c| c.id.to_string())
                .unwrap_or_default(),
            location: post
                .location
                .as_ref()
                .map(|l| l.id.to_string())
                .unwrap_or_default(),
            is_published: post.is_published,
            image_clear: false,
            current_image: post.image.clone(),
        }
    }

    /// Apply one text part of a multipart submission.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "pub_date" => self.pub_date = value,
            "category" => self.category = value,
            "location" => self.location = value,
            "is_published" => self.is_published = true,
            "image_clear" => self.image_clear = true,
            _ => {}
        }
    }

    pub fn is_category(&self, id: &i64) -> bool {
        self.category.trim() == id.to_string()
    }

    pub fn is_location(&self, id: &i64) -> bool {
        self.location.trim() == id.to_string()
    }

    /// The stored image is left for the handler to fill in.
    pub fn validate(
        &self,
        categories: &[Category],
        locations: &[Location],
        image: Option<&UploadedImage>,
    ) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        }
        check_length(&mut errors, "title", &title, TITLE_MAX);

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let pub_date = if self.pub_date.trim().is_empty() {
            errors.add("pub_date", REQUIRED);
            None
        } else {
            let parsed = parse_pub_date(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        };

        let invalid_choice = "Select a valid choice. That choice is not one of the available choices.";
        let category_id = if self.category.trim().is_empty() {
            errors.add("category", REQUIRED);
            None
        } else {
            let id = self
                .category
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|id| categories.iter().any(|c| c.id == *id));
            if id.is_none() {
                errors.add("category", invalid_choice);
            }
            id
        };

        let location_id = if self.location.trim().is_empty() {
            None
        } else {
            let id = self
                .location
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|id| locations.iter().any(|l| l.id == *id));
            if id.is_none() {
                errors.add("location", invalid_choice);
            }
            id
        };

        if let Some(image) = image {
            if !image.is_image() {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
        }

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(PostInput {
                title,
                text,
                pub_date,
                category_id,
                location_id,
                is_published: self.is_published,
                image: None,
            }),
            _ => Err(errors),
        }
    }
}

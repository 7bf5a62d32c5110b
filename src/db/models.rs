use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::Serialize;

/// Storage format for every timestamp column.
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_db_time(dt: &NaiveDateTime) -> String {
    dt.format(DB_TIME_FORMAT).to_string()
}

fn time_column(row: &Row<'_>, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DB_TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn display_time(dt: &NaiveDateTime) -> String {
    dt.format("%-d %B %Y, %H:%M").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub date_joined: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "id, username, email, first_name, last_name, password_hash, date_joined";

    pub fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            password_hash: row.get(5)?,
            date_joined: row.get(6)?,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: String,
}

impl Category {
    pub const COLUMNS: &'static str = "id, title, description, slug, is_published, created_at";

    pub fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Category {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            slug: row.get(3)?,
            is_published: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: String,
}

impl Location {
    pub const COLUMNS: &'static str = "id, name, is_published, created_at";

    pub fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Location {
            id: row.get(0)?,
            name: row.get(1)?,
            is_published: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// Category fields carried on a post row.
#[derive(Debug, Clone, Serialize)]
pub struct PostCategory {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// Location fields carried on a post row.
#[derive(Debug, Clone, Serialize)]
pub struct PostLocation {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

/// A post joined with its author, category, location and comment count.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub author_id: i64,
    pub author_username: String,
    pub category: Option<PostCategory>,
    pub location: Option<PostLocation>,
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: String,
    pub comment_count: i64,
}

impl Post {
    /// Select list matching [`Post::from_row`]; callers append `WHERE`/`ORDER BY`.
    pub const SELECT: &'static str = "SELECT p.id, p.title, p.text, p.pub_date, p.author_id, u.username,
                p.category_id, c.title, c.slug, c.is_published,
                p.location_id, l.name, l.is_published,
                p.image, p.is_published, p.created_at,
                (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id)
         FROM posts p
         JOIN users u ON u.id = p.author_id
         LEFT JOIN categories c ON c.id = p.category_id
         LEFT JOIN locations l ON l.id = p.location_id";

    pub fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let category = match row.get::<_, Option<i64>>(6)? {
            Some(id) => Some(PostCategory {
                id,
                title: row.get(7)?,
                slug: row.get(8)?,
                is_published: row.get(9)?,
            }),
            None => None,
        };
        let location = match row.get::<_, Option<i64>>(10)? {
            Some(id) => Some(PostLocation {
                id,
                name: row.get(11)?,
                is_published: row.get(12)?,
            }),
            None => None,
        };

        Ok(Post {
            id: row.get(0)?,
            title: row.get(1)?,
            text: row.get(2)?,
            pub_date: time_column(row, 3)?,
            author_id: row.get(4)?,
            author_username: row.get(5)?,
            category,
            location,
            image: row.get(13)?,
            is_published: row.get(14)?,
            created_at: row.get(15)?,
            comment_count: row.get(16)?,
        })
    }

    pub fn url(&self) -> String {
        format!("/posts/{}/", self.id)
    }

    pub fn pub_date_display(&self) -> String {
        display_time(&self.pub_date)
    }

    /// Value for a `datetime-local` input.
    pub fn pub_date_input(&self) -> String {
        self.pub_date.format("%Y-%m-%dT%H:%M").to_string()
    }

    /// First words of the text for listing cards.
    pub fn excerpt(&self) -> String {
        const WORDS: usize = 30;
        let words: Vec<&str> = self.text.split_whitespace().collect();
        if words.len() <= WORDS {
            words.join(" ")
        } else {
            format!("{} …", words[..WORDS].join(" "))
        }
    }

    /// Location name, shown only while the location is published.
    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .filter(|l| l.is_published)
            .map(|l| l.name.as_str())
    }

    /// Category link target, shown only while the category is published.
    pub fn category_link(&self) -> Option<&PostCategory> {
        self.category.as_ref().filter(|c| c.is_published)
    }

    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().map(|path| format!("/media/{}", path))
    }
}

/// A comment joined with its author's username.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub const SELECT: &'static str =
        "SELECT cm.id, cm.text, cm.post_id, cm.author_id, u.username, cm.created_at
         FROM comments cm
         JOIN users u ON u.id = cm.author_id";

    pub fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Comment {
            id: row.get(0)?,
            text: row.get(1)?,
            post_id: row.get(2)?,
            author_id: row.get(3)?,
            author_username: row.get(4)?,
            created_at: time_column(row, 5)?,
        })
    }

    pub fn created_at_display(&self) -> String {
        display_time(&self.created_at)
    }

    pub fn edit_url(&self) -> String {
        format!("/posts/{}/edit_comment/{}/", self.post_id, self.id)
    }

    pub fn delete_url(&self) -> String {
        format!("/posts/{}/delete_comment/{}/", self.post_id, self.id)
    }
}

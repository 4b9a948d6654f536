//! Identity facts for one request.
//!
//! The session layer resolves who is asking; the engine trusts what it is
//! handed and only asks the questions below.

use crate::error::{Error, Result};
use crate::orm::{articles, comments};

/// The requester: anonymous, a user, or a staff user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<i32>,
    pub is_staff: bool,
}

/// An entity with exactly one owning user.
pub trait Owned {
    fn owner_id(&self) -> i32;
}

impl Owned for articles::Model {
    fn owner_id(&self) -> i32 {
        self.author_id
    }
}

impl Owned for comments::Model {
    fn owner_id(&self) -> i32 {
        self.author_id
    }
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff: false,
        }
    }

    pub fn staff(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff: true,
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.user_id
    }

    pub fn is_user(&self) -> bool {
        self.user_id.is_some()
    }

    /// Require an authenticated viewer. Returns the user id.
    pub fn require_user(&self) -> Result<i32> {
        self.user_id
            .ok_or_else(|| Error::forbidden("Login required"))
    }

    pub fn require_staff(&self) -> Result<()> {
        if !self.is_staff {
            return Err(Error::forbidden("Staff only"));
        }
        Ok(())
    }

    pub fn owns(&self, resource: &impl Owned) -> bool {
        self.user_id == Some(resource.owner_id())
    }

    /// Owner or staff.
    pub fn can_modify(&self, resource: &impl Owned) -> bool {
        self.is_staff || self.owns(resource)
    }

    pub fn require_modify(&self, resource: &impl Owned) -> Result<()> {
        if !self.can_modify(resource) {
            return Err(Error::forbidden("You don't own this resource"));
        }
        Ok(())
    }

    /// Strict ownership; staff does not qualify.
    pub fn require_ownership(&self, resource: &impl Owned) -> Result<()> {
        self.require_user()?;
        if !self.owns(resource) {
            return Err(Error::forbidden("You don't own this resource"));
        }
        Ok(())
    }

    /// Article read rule: published and public, or owner, or staff.
    pub fn can_read_article(&self, article: &articles::Model) -> bool {
        article.is_publicly_visible() || self.can_modify(article)
    }
}

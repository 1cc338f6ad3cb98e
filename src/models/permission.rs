use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Catalogue permissions granted per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProducts,
    AddProducts,
    ChangeProducts,
    DeleteProducts,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::ViewProducts,
        Permission::AddProducts,
        Permission::ChangeProducts,
        Permission::DeleteProducts,
    ];

    pub fn codename(self) -> &'static str {
        match self {
            Permission::ViewProducts => "view_products",
            Permission::AddProducts => "add_products",
            Permission::ChangeProducts => "change_products",
            Permission::DeleteProducts => "delete_products",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.codename() == s)
            .ok_or_else(|| format!("Unknown permission: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codenames_parse_back() {
        for permission in Permission::ALL {
            assert_eq!(permission.codename().parse::<Permission>(), Ok(permission));
        }
        assert!("view_product".parse::<Permission>().is_err());
    }
}

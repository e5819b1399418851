use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "candidates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i32,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub years_of_experience: f64,
    #[sea_orm(column_name = "score_1")]
    pub score_1: i32,
    #[sea_orm(column_name = "score_2")]
    pub score_2: i32,
    #[sea_orm(column_name = "score_3")]
    pub score_3: i32,
    #[sea_orm(column_name = "score_4")]
    pub score_4: i32,
    // Only present on schemas with per-user ownership; never selected otherwise
    pub owner_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Columns every candidates schema carries. Reads go through this list so a
/// table without `owner_id` can still be queried.
pub const READ_COLUMNS: [Column; 11] = [
    Column::Id,
    Column::Name,
    Column::Role,
    Column::Email,
    Column::MobileNumber,
    Column::Skills,
    Column::YearsOfExperience,
    Column::Score1,
    Column::Score2,
    Column::Score3,
    Column::Score4,
];

/// A candidate row as selected through [`READ_COLUMNS`].
#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct CandidateRow {
    pub id: i32,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: f64,
    pub score_1: i32,
    pub score_2: i32,
    pub score_3: i32,
    pub score_4: i32,
}

impl CandidateRow {
    pub fn scores(&self) -> [i32; 4] {
        [self.score_1, self.score_2, self.score_3, self.score_4]
    }
}

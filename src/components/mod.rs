pub mod flash;
pub mod like_button;
pub mod subject_list;

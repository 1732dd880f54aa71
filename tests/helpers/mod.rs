#![allow(dead_code)]

pub mod api_test_helper;
pub mod mock_collaborators;
pub mod test_data_builder;

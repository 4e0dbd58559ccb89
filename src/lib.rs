pub mod constants;
pub mod error;

pub mod toolkit {
    pub mod grouping;
    pub mod lists;
    pub mod selection;
    pub mod split_params;
    pub mod train_test_split;
    pub mod tsf_reader;
}

pub mod bilstm {
    pub mod step_1_tensor_preparation;
    pub mod step_2_lstm_cell;
    pub mod step_3_bilstm_model_arch;
    pub mod step_4_dataset;
}

pub mod util {
    pub mod config;
    #[cfg(test)]
    pub mod test_utils;
}

pub use error::{FormatError, Result, ToolkitError};
pub use toolkit::lists::join_list_without_repeat;
pub use toolkit::selection::{
    select_by_fixed_fraction, select_by_index, select_by_relative_fraction, select_by_timestamp,
    FractionLocation, TimestampBound,
};
pub use toolkit::split_params::{get_split_params, SplitConfig, SplitParams};
pub use toolkit::train_test_split::{train_test_split, SplitFrames};
pub use toolkit::tsf_reader::{convert_tsf, convert_tsf_to_dataframe, TsfData, TsfReadOptions};

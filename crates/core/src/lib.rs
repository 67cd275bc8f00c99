//! Face swap core: face analysis, the inswapper model adapter, and the
//! image/frame-sequence swap pipeline.

pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod face;
    pub mod frame;
    pub mod media_type;
    pub mod model_cache;
    pub mod model_resolver;
}

pub mod detection {
    pub mod domain {
        pub mod face_analyser;
    }
    pub mod infrastructure;
}

pub mod swapping {
    pub mod domain {
        pub mod face_swapper;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod frame_reader;
        pub mod image_writer;
    }
    pub mod infrastructure {
        pub mod image_file_reader;
        pub mod image_file_writer;
    }
}

pub mod pipeline {
    pub mod face_selection;
    pub mod face_swap_use_case;
    pub mod frame_batch_executor;
    pub mod pipeline_logger;
    pub mod status_reporter;
    pub mod swap_session;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}

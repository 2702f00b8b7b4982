pub mod codec {
    pub mod domain {
        pub mod encoded_image;
        pub mod image_encoder;
        pub mod source_file;
    }
    pub mod infrastructure;
}

pub mod config {
    pub mod settings;
}

pub mod recognition {
    pub mod domain {
        pub mod oracle_request;
        pub mod recognition_oracle;
        pub mod recognition_result;
        pub mod response_parser;
    }
    pub mod infrastructure;
    pub mod recognition_client;
}

pub mod scanning {
    pub mod domain {
        pub mod analysis_sink;
        pub mod identity_source;
    }
    pub mod batch_scanner;
    pub mod processing_queue;
    pub mod scan_logger;
    pub mod scan_photo_use_case;
}

pub mod session {
    pub mod dashboard;
    pub mod session_store;
}

pub mod shared {
    pub mod analyzed_photo;
    pub mod constants;
    pub mod identity;
}

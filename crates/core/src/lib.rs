pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod video_metadata;
}

pub mod filtering {
    pub mod domain {
        pub mod clip;
        pub mod expression;
        pub mod filter_error;
        pub mod filter_host;
    }
    pub mod infrastructure;
}

pub mod derainbow {
    pub mod domain {
        pub mod frame_processor;
        pub mod rainbow_smooth;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod derainbow_image_use_case;
    pub mod derainbow_video_use_case;
    pub mod infrastructure;
    pub mod pipeline_executor;
    pub mod pipeline_logger;
}

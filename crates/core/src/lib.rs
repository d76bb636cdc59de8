pub mod capture {
    pub mod domain {
        pub mod camera_device;
        pub mod capture_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detection_batch;
        pub mod face_detector;
        pub mod orientation;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod image_writer;
        pub mod overlay_renderer;
        pub mod overlay_set;
        pub mod overlay_shape;
        pub mod viewport;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detect_image_use_case;
    pub mod infrastructure {
        pub mod threaded_live_pipeline;
    }
    pub mod live_pipeline;
    pub mod pipeline_logger;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod model_resolver;
}

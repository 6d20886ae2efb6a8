// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// COCO 17-keypoint skeleton (pairs of joint ids).
pub const COCO_SKELETON: [[u32; 2]; 19] = [
    [15, 13], // left ankle to left knee
    [13, 11], // left knee to left hip
    [16, 14], // right ankle to right knee
    [14, 12], // right knee to right hip
    [11, 12], // left hip to right hip
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [5, 6],   // left shoulder to right shoulder
    [5, 7],   // left shoulder to left elbow
    [6, 8],   // right shoulder to right elbow
    [7, 9],   // left elbow to left wrist
    [8, 10],  // right elbow to right wrist
    [1, 2],   // left eye to right eye
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [3, 5],   // left ear to left shoulder
    [4, 6],   // right ear to right shoulder
];

/// BODY-25 skeleton (pairs of joint ids).
pub const BODY_25_SKELETON: [[u32; 2]; 24] = [
    [1, 8],   // neck to mid hip
    [1, 2],   // neck to right shoulder
    [1, 5],   // neck to left shoulder
    [2, 3],   // right arm
    [3, 4],
    [5, 6], // left arm
    [6, 7],
    [8, 9], // right leg
    [9, 10],
    [10, 11],
    [8, 12], // left leg
    [12, 13],
    [13, 14],
    [1, 0], // neck to nose
    [0, 15], // face
    [15, 17],
    [0, 16],
    [16, 18],
    [14, 19], // left foot
    [19, 20],
    [14, 21],
    [11, 22], // right foot
    [22, 23],
    [11, 24],
];

/// MPI 15-keypoint skeleton (pairs of joint ids).
pub const MPI_15_SKELETON: [[u32; 2]; 14] = [
    [0, 1], // head to neck
    [1, 2],
    [2, 3],
    [3, 4],
    [1, 5],
    [5, 6],
    [6, 7],
    [1, 14], // neck to chest
    [14, 8],
    [8, 9],
    [9, 10],
    [14, 11],
    [11, 12],
    [12, 13],
];

pub mod seeta_face_classifier;
